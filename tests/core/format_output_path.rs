#[cfg(test)]
mod passing {
    use bookbinder::core::format_output_path;

    #[test]
    fn as_is() {
        let final_destination = format_output_path("output/book.pdf", Some(""));

        assert_eq!(final_destination, "output/book.pdf");
    }

    #[test]
    fn substitute_title() {
        let final_destination =
            format_output_path("output/%title%.pdf", Some("Agentic Design Patterns"));

        assert_eq!(final_destination, "output/Agentic Design Patterns.pdf");
    }

    #[test]
    fn substitute_title_multi() {
        let final_destination =
            format_output_path("output/%title%/%title%.pdf", Some("Patterns"));

        assert_eq!(final_destination, "output/Patterns/Patterns.pdf");
    }

    #[test]
    fn sanitize() {
        let final_destination = format_output_path(
            r#"output/<>:"|?/%title%.pdf"#,
            Some(r#"/\<>:"|?"#),
        );

        assert_eq!(final_destination, r#"output/<>:"|?/__[] - -.pdf"#);
    }

    #[test]
    fn level_up() {
        let final_destination = format_output_path("../%title%.pdf", Some(".Title"));

        assert_eq!(final_destination, "../Title.pdf");
    }

    #[test]
    fn timestamp_has_no_colons() {
        let final_destination = format_output_path("book-%timestamp%.pdf", None);

        assert!(final_destination.starts_with("book-"));
        assert!(final_destination.ends_with("Z.pdf"));
        assert!(!final_destination.contains(':'));
        assert!(!final_destination.contains("%timestamp%"));
    }
}

#[cfg(test)]
mod failing {
    use bookbinder::core::format_output_path;

    #[test]
    fn missing_title_leaves_empty_name() {
        let final_destination = format_output_path("output/%title%.pdf", None);

        assert_eq!(final_destination, "output/.pdf");
    }

    #[test]
    fn unknown_placeholder_is_kept() {
        let final_destination = format_output_path("output/%extension%.pdf", Some("Title"));

        assert_eq!(final_destination, "output/%extension%.pdf");
    }
}
