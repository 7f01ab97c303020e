// 集成测试公共模块
//
// 提供测试辅助工具和共享功能：片段文档生成、脚本化的翻译器、HTML 断言

#![allow(dead_code)]

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use bookbinder::docx::DocxBuilder;
use bookbinder::parsers::html::{html_to_dom, serialize_document};
use bookbinder::translation::config::constants::BATCH_DELIMITER;
use bookbinder::translation::{
    BatchMode, HeuristicClassifier, MisalignmentPolicy, TranslationConfig, TranslationError,
    TranslationResult, TranslationService, Translator,
};
use markup5ever_rcdom::RcDom;

/// 源目录构建器
pub struct FixtureTree {
    root: PathBuf,
}

impl FixtureTree {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 写入一个只有标题和一段正文的片段
    pub fn chapter(&self, rel: &str, heading: &str, body: &str) -> PathBuf {
        let path = self.root.join(rel);
        DocxBuilder::new()
            .heading(1, heading)
            .paragraph(body)
            .write(&path)
            .unwrap();
        path
    }

    /// 写入任意文件，用于制造干扰项
    pub fn file(&self, rel: &str, content: &[u8]) -> PathBuf {
        let path = self.root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }
}

/// 服务提供方的脚本化行为
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Script {
    /// 每段加前缀 `[KO] `
    Prefix,
    /// 批次请求少返回一段
    DropLastSegment,
    /// 批次请求的最后一段为空
    BlankLastSegment,
    /// 所有请求返回服务端错误
    ServerError,
    /// 所有请求返回认证失败
    Unauthorized,
}

/// 记录调用的假翻译器
pub struct ScriptedTranslator {
    script: Script,
    calls: Rc<RefCell<Vec<String>>>,
}

impl ScriptedTranslator {
    pub fn new(script: Script) -> (Self, Rc<RefCell<Vec<String>>>) {
        let calls = Rc::new(RefCell::new(Vec::new()));
        (
            Self {
                script,
                calls: calls.clone(),
            },
            calls,
        )
    }
}

impl Translator for ScriptedTranslator {
    fn name(&self) -> &str {
        "scripted"
    }

    fn translate(&self, text: &str) -> TranslationResult<String> {
        self.calls.borrow_mut().push(text.to_string());

        let mut segments: Vec<String> = text
            .split(BATCH_DELIMITER)
            .map(|s| format!("[KO] {}", s.trim()))
            .collect();

        match self.script {
            Script::Prefix => {}
            Script::DropLastSegment => {
                if segments.len() > 1 {
                    segments.pop();
                }
            }
            Script::BlankLastSegment => {
                if let Some(last) = segments.last_mut() {
                    last.clear();
                }
            }
            Script::ServerError => {
                return Err(TranslationError::ApiError {
                    status: 500,
                    message: "upstream unavailable".to_string(),
                })
            }
            Script::Unauthorized => {
                return Err(TranslationError::ApiError {
                    status: 401,
                    message: "invalid x-api-key".to_string(),
                })
            }
        }

        Ok(segments.join(BATCH_DELIMITER))
    }
}

/// 测试配置构建器
pub struct TestConfigBuilder {
    config: TranslationConfig,
}

impl TestConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: TranslationConfig::default(),
        }
    }

    pub fn batch(mut self, max_chars: usize, max_items: usize) -> Self {
        self.config.batch_mode = BatchMode::Batch;
        self.config.batch_max_chars = max_chars;
        self.config.batch_max_items = max_items;
        self
    }

    pub fn misalignment(mut self, policy: MisalignmentPolicy) -> Self {
        self.config.misalignment = policy;
        self
    }

    pub fn build(self) -> TranslationConfig {
        self.config
    }

    /// 组装使用脚本化翻译器和默认分类器的服务
    pub fn service(self, script: Script) -> (TranslationService, Rc<RefCell<Vec<String>>>) {
        let config = self.build();
        let (translator, calls) = ScriptedTranslator::new(script);
        let classifier = HeuristicClassifier::new(&config.target_lang);
        let service = TranslationService::new(Box::new(translator), Box::new(classifier), config);
        (service, calls)
    }
}

/// HTML测试工具
pub struct HtmlTestHelper;

impl HtmlTestHelper {
    pub fn dom(html: &str) -> RcDom {
        html_to_dom(html.as_bytes(), "utf-8").unwrap()
    }

    pub fn serialize(dom: &RcDom) -> String {
        String::from_utf8(serialize_document(dom).unwrap()).unwrap()
    }

    /// 一章技术书籍内容：正文、代码块、行内代码、等宽字体、表格
    pub fn technical_chapter() -> String {
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>Chapter 1</title></head>
<body>
<h1>Chapter 1: Prompt Chaining</h1>
<p>The agent plans its next action.</p>
<pre class="code">import numpy as np
result = np.mean(values)</pre>
<p>Call <code>chain.invoke()</code> to run the pipeline.</p>
<p><span style="font-family: &quot;Courier New&quot;">pip install langchain</span></p>
<table>
<tr><td>x = 5</td><td>Hello there</td></tr>
</table>
<p>The agent plans its next action.</p>
</body>
</html>"#
            .to_string()
    }
}
