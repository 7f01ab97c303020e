use std::io;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use thiserror::Error;

use crate::builders::pdf::{PageLayout, RenderError, Renderer};
use crate::builders::toc::insert_auto_toc;
use crate::docx::{merge_in_order, ComposeStats, ConvertStats, CoverText, DocxConverter, DocxError};
use crate::env::{book, paths, EnvError, EnvVar};
use crate::parsers::html::{inline_images, read_html_file, write_html_file, InlineStats};
use crate::toc::{build_order, OrderedFragments, TocSpec};
use crate::translation::{translate_html_file, TranslationError, TranslationReport, TranslationService};

/// Represents errors that can occur while building a book
///
/// Resolution warnings and per-node translation failures are not errors;
/// they are logged and reported. Everything here stops the current stage.
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("invalid table-of-contents spec: {0}")]
    TocSpec(String),

    #[error("cannot access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("missing input {} (run the previous stage first)", .0.display())]
    MissingInput(PathBuf),

    #[error("no .docx fragments found under {}", .0.display())]
    NoFragments(PathBuf),

    #[error(transparent)]
    Docx(#[from] DocxError),

    #[error(transparent)]
    Translation(#[from] TranslationError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Config(#[from] EnvError),
}

pub const MASTER_DOCX: &str = "master_en.docx";
pub const MASTER_HTML: &str = "master_en.html";
pub const TRANSLATED_HTML: &str = "master_ko.html";
pub const TM_FILE: &str = "tm.json";
pub const COVER_DOCX: &str = "cover.docx";
pub const TOC_DOCX: &str = "toc.docx";

/// Configuration for one book build
///
/// Every stage reads its input from and writes its output to a fixed file
/// under `work_dir`, so each stage can be rerun on its own.
#[derive(Debug, Clone)]
pub struct BookOptions {
    /// Fragment source tree; only the ordering stage needs it
    pub src_dir: Option<PathBuf>,
    pub work_dir: PathBuf,
    pub output_dir: PathBuf,
    pub assets_dir: PathBuf,
    /// Explicit TOC spec file, overriding `<src_dir>/toc.toml`
    pub toc_file: Option<PathBuf>,
    pub title: String,
    pub subtitle: String,
    pub pdf_name: String,
}

fn default_text<T, V: EnvVar<T>>() -> String {
    V::DEFAULT_TEXT.unwrap_or_default().to_string()
}

impl Default for BookOptions {
    fn default() -> Self {
        Self {
            src_dir: None,
            work_dir: PathBuf::from(default_text::<PathBuf, paths::WorkDir>()),
            output_dir: PathBuf::from(default_text::<PathBuf, paths::OutputDir>()),
            assets_dir: PathBuf::from(default_text::<PathBuf, paths::AssetsDir>()),
            toc_file: None,
            title: default_text::<String, book::Title>(),
            subtitle: default_text::<String, book::Subtitle>(),
            pdf_name: default_text::<String, book::PdfName>(),
        }
    }
}

impl BookOptions {
    /// Reads every setting from the environment
    ///
    /// A variable that is set but invalid is an error; unset variables fall
    /// back to their defaults.
    pub fn from_env() -> Result<Self, BuildError> {
        Ok(Self {
            src_dir: paths::SrcDir::get_opt()?,
            work_dir: paths::WorkDir::get()?,
            output_dir: paths::OutputDir::get()?,
            assets_dir: paths::AssetsDir::get()?,
            toc_file: paths::TocFile::get_opt()?,
            title: book::Title::get()?,
            subtitle: book::Subtitle::get()?,
            pdf_name: book::PdfName::get()?,
        })
    }

    /// Source directory, required for ordering
    pub fn require_src_dir(&self) -> Result<&Path, BuildError> {
        self.src_dir.as_deref().ok_or_else(|| {
            BuildError::Config(EnvError {
                variable: paths::SrcDir::NAME.to_string(),
                message: "Required environment variable not set".to_string(),
            })
        })
    }

    pub fn master_docx(&self) -> PathBuf {
        self.work_dir.join(MASTER_DOCX)
    }

    pub fn master_html(&self) -> PathBuf {
        self.work_dir.join(MASTER_HTML)
    }

    pub fn translated_html(&self) -> PathBuf {
        self.work_dir.join(TRANSLATED_HTML)
    }

    pub fn tm_path(&self) -> PathBuf {
        self.work_dir.join(TM_FILE)
    }

    pub fn cover_docx(&self) -> PathBuf {
        self.assets_dir.join(COVER_DOCX)
    }

    pub fn toc_docx(&self) -> PathBuf {
        self.assets_dir.join(TOC_DOCX)
    }

    /// Final PDF path, with `%title%` and `%timestamp%` substituted in the name
    pub fn pdf_path(&self) -> PathBuf {
        self.output_dir
            .join(format_output_path(&self.pdf_name, Some(&self.title)))
    }
}

/// Counts from the assembly stage
#[derive(Debug, Clone, Default)]
pub struct AssembleReport {
    pub compose: ComposeStats,
    pub convert: ConvertStats,
    /// Number of entries in the generated TOC, zero when a TOC document was supplied
    pub toc_entries: usize,
    pub images: InlineStats,
}

/// Results of a full build
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub fragments: usize,
    pub warnings: usize,
    pub assemble: AssembleReport,
    pub translation: TranslationReport,
    pub pdf: PathBuf,
}

/// Runs the build stages in order
///
/// Each stage method can also be called on its own; it only depends on the
/// intermediate file written by the previous stage.
pub struct Pipeline {
    options: BookOptions,
}

impl Pipeline {
    pub fn new(options: BookOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &BookOptions {
        &self.options
    }

    /// Resolves the fragment order from the TOC spec
    pub fn order(&self) -> Result<OrderedFragments, BuildError> {
        let src_dir = self.options.require_src_dir()?;
        let spec = TocSpec::discover(src_dir, self.options.toc_file.as_deref())?;
        let ordered = build_order(src_dir, &spec)?;

        tracing::info!(
            "Resolved {} fragments ({} warnings)",
            ordered.len(),
            ordered.warnings.len()
        );
        Ok(ordered)
    }

    /// Merges the fragments and produces `master_en.html`
    ///
    /// Steps: merge into `master_en.docx`, convert to HTML, insert the auto
    /// TOC when no TOC document was supplied, then inline images.
    pub fn assemble(&self, fragments: &OrderedFragments) -> Result<AssembleReport, BuildError> {
        if fragments.is_empty() {
            let root = self.options.src_dir.clone().unwrap_or_default();
            return Err(BuildError::NoFragments(root));
        }

        let master = self.options.master_docx();
        let cover = self.options.cover_docx();
        let toc = self.options.toc_docx();
        let cover_text = CoverText {
            title: self.options.title.clone(),
            subtitle: self.options.subtitle.clone(),
        };

        let outcome = merge_in_order(
            &fragments.paths(),
            &master,
            Some(&cover),
            Some(&toc),
            &cover_text,
        )?;
        tracing::info!(
            "Merged {} parts into {}",
            outcome.stats.parts,
            outcome.path.display()
        );

        let html = self.options.master_html();
        let convert = DocxConverter::new()
            .with_title(&self.options.title)
            .convert_file(&outcome.path, &html)?;

        let io_err = |source| BuildError::Io {
            path: html.clone(),
            source,
        };
        let dom = read_html_file(&html).map_err(io_err)?;

        let toc_entries = if outcome.insert_auto_toc {
            insert_auto_toc(&dom)
        } else {
            0
        };

        let html_dir = html.parent().unwrap_or_else(|| Path::new("."));
        let images = inline_images(&dom, html_dir);
        write_html_file(&dom, &html).map_err(io_err)?;

        tracing::info!("Wrote {}", html.display());
        Ok(AssembleReport {
            compose: outcome.stats,
            convert,
            toc_entries,
            images,
        })
    }

    /// Translates `master_en.html` into `master_ko.html`
    pub fn translate(
        &self,
        service: &mut TranslationService,
    ) -> Result<TranslationReport, BuildError> {
        let input = require_file(self.options.master_html())?;
        let report = translate_html_file(
            &input,
            &self.options.translated_html(),
            &self.options.tm_path(),
            service,
        )?;

        tracing::info!("{}", report);
        Ok(report)
    }

    /// Renders `master_ko.html` to the final PDF
    pub fn render(&self, renderer: &dyn Renderer) -> Result<PathBuf, BuildError> {
        let input = require_file(self.options.translated_html())?;
        let pdf = self.options.pdf_path();
        let layout = PageLayout::for_title(&self.options.title);

        renderer.render(&input, &pdf, &layout)?;
        Ok(pdf)
    }

    /// Runs every stage
    ///
    /// The translation service is built only once assembly has succeeded, so a
    /// missing API key does not prevent `master_en.html` from being produced.
    pub fn run<F>(&self, make_service: F, renderer: &dyn Renderer) -> Result<BuildReport, BuildError>
    where
        F: FnOnce() -> Result<TranslationService, BuildError>,
    {
        let ordered = self.order()?;
        let assemble = self.assemble(&ordered)?;
        let mut service = make_service()?;
        let translation = self.translate(&mut service)?;
        let pdf = self.render(renderer)?;

        Ok(BuildReport {
            fragments: ordered.len(),
            warnings: ordered.warnings.len(),
            assemble,
            translation,
            pdf,
        })
    }
}

fn require_file(path: PathBuf) -> Result<PathBuf, BuildError> {
    if path.is_file() {
        Ok(path)
    } else {
        Err(BuildError::MissingInput(path))
    }
}

/// Formats output path with title substitution and sanitization
///
/// ```
/// use bookbinder::core::format_output_path;
///
/// assert_eq!(format_output_path("%title%.pdf", Some("Part 1: Intro")), "Part 1 -  Intro.pdf");
/// ```
pub fn format_output_path(path: &str, document_title: Option<&str>) -> String {
    let datetime: &str = &Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
    let title = document_title.unwrap_or("");

    path.replace("%timestamp%", &datetime.replace(':', "_"))
        .replace(
            "%title%",
            title
                .replace(['/', '\\'], "_")
                .replace('<', "[")
                .replace('>', "]")
                .replace(':', " - ")
                .replace('\"', "")
                .replace('|', "-")
                .replace('?', "")
                .trim_start_matches('.'),
        )
}
