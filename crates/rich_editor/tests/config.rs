use manos_rich_editor::{
    BulletConfig, BulletStyle, EditorContent, EditorProps, EditorValue, TextStyle, parse_markup,
    to_markup,
};

#[test]
fn props_fill_defaults_from_partial_json() -> anyhow::Result<()> {
    let props = EditorProps::from_json_str(
        &serde_json::json!({
            "value": "<p>x</p>",
            "max_length": 50,
            "bullets": { "level_map": ["check", "star"] },
            "html_insert": { "enabled": true }
        })
        .to_string(),
    )?;

    assert!(props.is_controlled());
    assert_eq!(props.initial_markup(), "<p>x</p>");
    assert_eq!(props.max_length, Some(50));
    assert!(props.html_insert.enabled);
    assert_eq!(props.html_insert.label, "Insert HTML");
    assert_eq!(props.session.max_undo, 200);
    assert_eq!(props.session.max_normalize_iterations, 100);

    let policy = props.bullets.policy();
    assert_eq!(policy.level_map, vec!["check", "star"]);
    assert_eq!(policy.default_style, "dot");
    assert_eq!(policy.nested_style, "circle");
    Ok(())
}

#[test]
fn default_value_is_used_when_uncontrolled() {
    let props = EditorProps {
        default_value: Some("<p>d</p>".into()),
        ..EditorProps::default()
    };
    assert!(!props.is_controlled());
    assert_eq!(props.initial_markup(), "<p>d</p>");
    assert_eq!(EditorProps::default().initial_markup(), "");
}

#[test]
fn duplicate_catalogue_falls_back_to_builtins() {
    let config = BulletConfig {
        catalogue: Some(vec![
            BulletStyle::glyph("a", "A", "-", "#000", "1em"),
            BulletStyle::glyph("a", "A again", "+", "#000", "1em"),
        ]),
        ..BulletConfig::default()
    };
    let registry = config.registry();
    assert_eq!(registry.len(), 6);
    assert!(registry.contains("dot"));
}

#[test]
fn custom_default_and_nested_styles() {
    let config = BulletConfig {
        default_style: Some("check".into()),
        nested_style: Some("star".into()),
        ..BulletConfig::default()
    };
    let policy = config.policy();
    assert_eq!(policy.target_style(1), "check");
    assert_eq!(policy.target_style(3), "star");
}

#[test]
fn text_style_renders_css() {
    let style = TextStyle {
        color: Some("#222".into()),
        line_height: Some("1.5".into()),
        ..TextStyle::default()
    };
    assert_eq!(style.to_css(), "color: #222; line-height: 1.5;");
    assert_eq!(TextStyle::default().to_css(), "");
}

#[test]
fn toolbar_options_come_from_props() {
    let mut props = EditorProps::default().with_defaults();
    props.show_text_color = true;
    props.template.enabled = true;
    props.disabled = true;

    let options = props.toolbar_options();
    assert!(options.show_text_color);
    assert!(options.show_template);
    assert!(!options.show_html_insert);
    assert!(options.disabled);
    assert_eq!(options.html_label.as_deref(), Some("Insert HTML"));
}

#[test]
fn content_round_trips_through_json() -> anyhow::Result<()> {
    let doc = parse_markup("<p>Hi <strong>there</strong></p><ul><li>one</li></ul>");
    let content = EditorContent::from_document(&doc);
    assert_eq!(content.plain_text, "Hi there\none");

    let json = serde_json::to_value(&content)?;
    assert_eq!(
        json,
        serde_json::json!({
            "markup": "<p>Hi <strong>there</strong></p><ul><li>one</li></ul>",
            "plain_text": "Hi there\none"
        })
    );
    let back: EditorContent = serde_json::from_value(json)?;
    assert_eq!(back, content);
    Ok(())
}

#[test]
fn stored_value_defaults_schema_and_version() -> anyhow::Result<()> {
    let value = EditorValue::from_json_str(r#"{ "markup": "<p>a</p>" }"#)?;
    assert_eq!(value.schema, "manos-rich-editor");
    assert_eq!(value.version, 1);

    let doc = value.clone().into_document();
    assert_eq!(to_markup(&doc), "<p>a</p>");
    assert_eq!(EditorValue::from_document(&doc), value);

    let pretty = value.to_json_pretty()?;
    assert_eq!(EditorValue::from_json_str(&pretty)?, value);
    Ok(())
}
