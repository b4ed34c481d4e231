use std::cell::RefCell;
use std::rc::Rc;
use std::time::Instant;

use manos_rich_editor::{
    BULLET_CONTENT_ATTR, BULLET_ICON_ATTR, BULLET_STYLE_ATTR, EditorCallbacks, EditorContent,
    EditorProps, HtmlInsert, KeyPress, MemorySurface, NativeCommand, Point, RichTextEditor,
    SEED_DEBOUNCE, Selection, SelectionChange, SelectionHub, SelectionReflector, SurfaceId,
    TemplateInsert, TextStyle, ToolbarAction, Toolbar,
};

fn caret(path: Vec<usize>, offset: usize) -> Selection {
    Selection::collapsed(Point::new(path, offset))
}

fn recording() -> (EditorCallbacks, Rc<RefCell<Vec<EditorContent>>>) {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    let callbacks = EditorCallbacks::new().on_change(move |content| {
        sink.borrow_mut().push(content.clone());
    });
    (callbacks, seen)
}

fn with_default(markup: &str) -> EditorProps {
    EditorProps {
        default_value: Some(markup.to_string()),
        ..EditorProps::default()
    }
}

#[test]
fn controlled_value_replaces_content_without_interaction() {
    let (callbacks, seen) = recording();
    let mut editor = RichTextEditor::new(
        EditorProps {
            value: Some("<p>x</p>".into()),
            ..EditorProps::default()
        },
        callbacks,
    );
    assert_eq!(editor.markup(), "<p>x</p>");

    editor.sync_value(Some("<p>y</p>"));
    assert_eq!(editor.markup(), "<p>y</p>");
    assert_eq!(editor.content().plain_text, "y");
    assert!(seen.borrow().is_empty());
}

#[test]
fn echoed_value_keeps_the_caret() {
    let mut editor = RichTextEditor::new(
        EditorProps {
            value: Some("<p>hello</p>".into()),
            ..EditorProps::default()
        },
        EditorCallbacks::new(),
    );
    editor.select(caret(vec![0, 0], 2));
    editor.sync_value(Some("<p>hello</p>"));
    assert_eq!(editor.selection().focus, Point::new(vec![0, 0], 2));
}

#[test]
fn character_count_under_and_over_the_limit() {
    let editor = RichTextEditor::new(
        EditorProps {
            value: Some(format!("<p>{}</p>", "a".repeat(42))),
            max_length: Some(50),
            show_character_count: true,
            ..EditorProps::default()
        },
        EditorCallbacks::new(),
    );
    let count = editor.character_count();
    assert_eq!(count.count, 42);
    assert!(!count.over_limit);
    assert_eq!(
        editor.character_count_label().as_deref(),
        Some("42/50 characters")
    );

    let editor = RichTextEditor::new(
        EditorProps {
            value: Some(format!("<p>{}</p>", "a".repeat(51))),
            max_length: Some(50),
            ..EditorProps::default()
        },
        EditorCallbacks::new(),
    );
    assert!(editor.character_count().over_limit);
    assert_eq!(editor.character_count().label(), "51/50 characters");
    assert_eq!(editor.character_count_label(), None);
}

#[test]
fn count_follows_typing() {
    let mut editor = RichTextEditor::new(
        EditorProps {
            max_length: Some(3),
            ..EditorProps::default()
        },
        EditorCallbacks::new(),
    );
    assert_eq!(editor.character_count().label(), "0/3 characters");
    editor.type_text("abcd");
    assert_eq!(editor.character_count().count, 4);
    assert!(editor.character_count().over_limit);
}

#[test]
fn selection_outside_surface_leaves_state_alone() {
    let mut editor = RichTextEditor::new(
        with_default("<p><strong>bold</strong> plain</p>"),
        EditorCallbacks::new(),
    );
    let before = editor.format_state().clone();
    assert!(!before.bold);

    let outside = SelectionChange::outside(caret(vec![0, 0], 2));
    assert!(!editor.handle_selection_change(&outside));
    assert_eq!(editor.format_state(), &before);

    let elsewhere = SelectionChange::inside(SurfaceId::next(), caret(vec![0, 0], 2));
    assert!(!editor.handle_selection_change(&elsewhere));
    assert_eq!(editor.format_state(), &before);

    let inside = SelectionChange::inside(editor.id(), caret(vec![0, 0], 2));
    assert!(editor.handle_selection_change(&inside));
    assert!(editor.format_state().bold);
}

#[test]
fn hub_delivers_only_to_the_owning_editor() {
    let mut hub = SelectionHub::new();
    let mut first = RichTextEditor::new(with_default("<p><em>a</em>b</p>"), EditorCallbacks::new());
    let mut second = RichTextEditor::new(with_default("<p><em>c</em>d</p>"), EditorCallbacks::new());
    first.attach(&mut hub);
    second.attach(&mut hub);
    assert_eq!(hub.subscriber_count(), 2);

    hub.broadcast(SelectionChange::inside(first.id(), caret(vec![0, 0], 1)));
    assert!(!second.poll_selection());
    assert!(!second.format_state().italic);
    assert!(first.poll_selection());
    assert!(first.format_state().italic);

    drop(second);
    hub.broadcast(SelectionChange::outside(caret(vec![0, 0], 0)));
    assert_eq!(hub.subscriber_count(), 1);
}

#[test]
fn html_insertion_falls_back_to_append() {
    let (callbacks, seen) = recording();
    let surface = MemorySurface::from_markup("<p>hello</p>").without(NativeCommand::InsertHtml);
    let mut editor = RichTextEditor::with_port(
        surface,
        EditorProps {
            html_insert: HtmlInsert {
                enabled: true,
                seed: "<p>seed</p>".into(),
                ..HtmlInsert::default()
            },
            ..EditorProps::default()
        },
        callbacks,
    );

    editor.dispatch(ToolbarAction::OpenHtmlDialog);
    assert!(editor.dialog().is_open());
    assert_eq!(editor.dialog().draft(), "<p>seed</p>");

    editor.confirm_html_dialog();
    assert!(!editor.dialog().is_open());
    assert!(editor.markup().ends_with("<p>seed</p>"));
    assert_eq!(editor.markup(), "<p>hello</p><p>seed</p>");

    let seen = seen.borrow();
    let last = seen.last().expect("change emitted");
    assert!(last.markup.ends_with("<p>seed</p>"));
    assert_eq!(last.plain_text, "hello\nseed");
}

#[test]
fn blank_html_draft_changes_nothing() {
    let (callbacks, seen) = recording();
    let mut props = with_default("<p>a</p>");
    props.html_insert.enabled = true;
    let mut editor = RichTextEditor::new(props, callbacks);
    editor.open_html_dialog();
    assert!(editor.dialog().is_open());
    editor.set_html_draft("   ");
    editor.confirm_html_dialog();
    assert_eq!(editor.markup(), "<p>a</p>");
    assert!(seen.borrow().is_empty());
}

#[test]
fn html_override_receives_seed() {
    let opened = Rc::new(RefCell::new(None));
    let sink = Rc::clone(&opened);
    let mut editor = RichTextEditor::new(
        EditorProps {
            html_insert: HtmlInsert {
                enabled: true,
                seed: "<p>s</p>".into(),
                ..HtmlInsert::default()
            },
            ..EditorProps::default()
        },
        EditorCallbacks::new().on_open_html(move |seed| {
            *sink.borrow_mut() = Some(seed.to_string());
        }),
    );
    editor.open_html_dialog();
    assert!(!editor.dialog().is_open());
    assert_eq!(opened.borrow().as_deref(), Some("<p>s</p>"));
}

#[test]
fn tab_outside_list_inserts_four_spaces() {
    let (callbacks, seen) = recording();
    let mut editor = RichTextEditor::new(with_default("<p>ab</p>"), callbacks);

    assert!(editor.handle_key(KeyPress::tab()));
    assert_eq!(editor.markup(), "<p>ab    </p>");
    assert_eq!(editor.content().plain_text, "ab    ");
    assert_eq!(editor.selection().focus, Point::new(vec![0, 0], 6));
    assert_eq!(seen.borrow().len(), 1);
}

#[test]
fn tab_inside_list_nests_and_shift_tab_lifts() {
    let mut editor = RichTextEditor::new(
        with_default("<ul><li>one</li><li>two</li></ul>"),
        EditorCallbacks::new(),
    );
    editor.select(caret(vec![0, 1, 0], 1));

    assert!(editor.handle_key(KeyPress::tab()));
    let inner = editor.document().element(&[0, 0, 1]).expect("nested list");
    assert_eq!(inner.attr(BULLET_STYLE_ATTR), Some("circle"));
    let outer = editor.document().element(&[0]).expect("outer list");
    assert_eq!(outer.attr(BULLET_STYLE_ATTR), Some("dot"));
    assert_eq!(editor.content().plain_text, "one\ntwo");

    assert!(editor.handle_key(KeyPress::shift_tab()));
    assert!(editor.document().element(&[0, 0, 1]).is_none());
    assert_eq!(editor.document().text_node(&[0, 1, 0]).map(|t| t.text.as_str()), Some("two"));
}

#[test]
fn toggle_list_assigns_default_bullet() {
    let mut editor = RichTextEditor::new(with_default("<p>item</p>"), EditorCallbacks::new());
    editor.dispatch(ToolbarAction::ToggleList);

    let list = editor.document().element(&[0]).expect("list");
    assert_eq!(list.tag, "ul");
    assert_eq!(list.attr(BULLET_STYLE_ATTR), Some("dot"));
    assert_eq!(list.attr(BULLET_CONTENT_ATTR), Some("\u{2022}"));
    assert!(editor.format_state().list_active);
    assert_eq!(editor.format_state().current_bullet_style.as_deref(), Some("dot"));
}

#[test]
fn selecting_a_bullet_style_creates_list_and_marks_control_active() {
    let mut editor = RichTextEditor::new(with_default("<p>item</p>"), EditorCallbacks::new());
    editor.dispatch(ToolbarAction::SelectBulletStyle("check-circle-orange".into()));

    let list = editor.document().element(&[0]).expect("list");
    assert_eq!(list.attr(BULLET_STYLE_ATTR), Some("check-circle-orange"));
    assert_eq!(list.attr(BULLET_ICON_ATTR), Some("true"));
    assert_eq!(
        editor.format_state().current_bullet_style.as_deref(),
        Some("check-circle-orange")
    );

    let controls = editor.toolbar_controls();
    let picked = Toolbar::find(&controls, "bullet:check-circle-orange").expect("control");
    assert!(picked.active);
    let dot = Toolbar::find(&controls, "bullet:dot").expect("control");
    assert!(!dot.active);
    let list_button = Toolbar::find(&controls, "list").expect("control");
    assert!(list_button.active);
}

#[test]
fn switching_bullet_style_drops_icon_flag() {
    let mut editor = RichTextEditor::new(with_default("<p>item</p>"), EditorCallbacks::new());
    editor.select_bullet_style("check-circle-orange");
    editor.select_bullet_style("star");

    let list = editor.document().element(&[0]).expect("list");
    assert_eq!(list.attr(BULLET_STYLE_ATTR), Some("star"));
    assert_eq!(list.attr(BULLET_ICON_ATTR), None);
    assert_eq!(list.attr(BULLET_CONTENT_ATTR), Some("\u{2605}"));
}

#[test]
fn nested_style_is_kept_after_list_moves_to_top_level() {
    let mut editor = RichTextEditor::new(
        with_default("<ul><li>a<ul><li>b</li></ul></li></ul>"),
        EditorCallbacks::new(),
    );
    // Lifting "a" out of the outer list leaves the inner list at depth 1,
    // still carrying the style it got as a nested list.
    editor.select(caret(vec![0, 0, 0], 1));
    editor.toggle_list();

    assert!(editor.markup().starts_with("<p>a</p><ul"));
    let list = editor.document().element(&[1]).expect("former nested list");
    assert_eq!(list.attr(BULLET_STYLE_ATTR), Some("circle"));
}

#[test]
fn level_map_wins_over_manual_choice() {
    let mut props = with_default("<p>item</p>");
    props.bullets.level_map = vec!["check".into(), "star".into()];
    let mut editor = RichTextEditor::new(props, EditorCallbacks::new());

    editor.select_bullet_style("dot");
    let list = editor.document().element(&[0]).expect("list");
    assert_eq!(list.attr(BULLET_STYLE_ATTR), Some("check"));
}

#[test]
fn marks_and_color_go_through_the_pipeline() {
    let (callbacks, seen) = recording();
    let mut editor = RichTextEditor::new(with_default("<p>ab</p>"), callbacks);

    editor.dispatch(ToolbarAction::ToggleBold);
    assert!(editor.format_state().bold);
    editor.type_text("c");
    assert_eq!(editor.markup(), "<p>ab<strong>c</strong></p>");

    editor.select(Selection {
        anchor: Point::new(vec![0, 0], 0),
        focus: Point::new(vec![0, 0], 2),
    });
    editor.dispatch(ToolbarAction::ChangeColor("red".into()));
    assert_eq!(
        editor.markup(),
        r#"<p><span style="color: red;">ab</span><strong>c</strong></p>"#
    );
    assert_eq!(seen.borrow().len(), 3);
}

#[test]
fn template_insertion_uses_configured_markup() {
    let mut props = with_default("<p>hi</p>");
    props.template = TemplateInsert {
        enabled: true,
        markup: "<p>Template</p>".into(),
    };
    let mut editor = RichTextEditor::new(props, EditorCallbacks::new());
    editor.dispatch(ToolbarAction::InsertTemplate);
    assert_eq!(editor.markup(), "<p>hi</p><p>Template</p>");
}

#[test]
fn template_override_replaces_builtin_insertion() {
    let calls = Rc::new(RefCell::new(0));
    let sink = Rc::clone(&calls);
    let mut props = with_default("<p>hi</p>");
    props.template = TemplateInsert {
        enabled: true,
        markup: "<p>Template</p>".into(),
    };
    let mut editor = RichTextEditor::new(
        props,
        EditorCallbacks::new().on_insert_template(move || *sink.borrow_mut() += 1),
    );
    editor.insert_template();
    assert_eq!(*calls.borrow(), 1);
    assert_eq!(editor.markup(), "<p>hi</p>");
}

#[test]
fn disabled_editor_ignores_input() {
    let (callbacks, seen) = recording();
    let mut props = with_default("<p>x</p>");
    props.disabled = true;
    let mut editor = RichTextEditor::new(props, callbacks);

    editor.type_text("y");
    editor.toggle_list();
    editor.insert_html("<p>z</p>");
    assert!(!editor.handle_key(KeyPress::tab()));
    assert_eq!(editor.markup(), "<p>x</p>");
    assert!(seen.borrow().is_empty());
    assert!(editor.toolbar_controls().iter().all(|c| c.click().is_none()));

    editor.set_disabled(false);
    editor.type_text("y");
    assert_eq!(editor.markup(), "<p>xy</p>");
}

#[test]
fn undo_reverts_text_and_bullet_normalization_together() {
    let mut editor = RichTextEditor::new(with_default("<p>item</p>"), EditorCallbacks::new());
    editor.toggle_list();
    assert!(editor.markup().starts_with("<ul"));

    editor.undo();
    assert_eq!(editor.markup(), "<p>item</p>");
    assert!(editor.port().session().can_redo());
    editor.redo();
    assert!(!editor.port().session().can_redo());
    assert!(editor.port().session().can_undo());
    let list = editor.document().element(&[0]).expect("list");
    assert_eq!(list.attr(BULLET_STYLE_ATTR), Some("dot"));
}

#[test]
fn placeholder_shows_only_when_empty() {
    let mut editor = RichTextEditor::new(
        EditorProps {
            placeholder: Some("Tell us about yourself".into()),
            ..EditorProps::default()
        },
        EditorCallbacks::new(),
    );
    assert!(editor.placeholder_visible());
    editor.type_text("hi");
    assert!(!editor.placeholder_visible());
    assert_eq!(editor.markup(), "hi");
}

#[test]
fn rejected_commands_are_swallowed() {
    let (callbacks, seen) = recording();
    let surface = MemorySurface::from_markup("<p>x</p>").rejecting(NativeCommand::Bold);
    let mut editor = RichTextEditor::with_port(surface, EditorProps::default(), callbacks);
    editor.select(Selection {
        anchor: Point::new(vec![0, 0], 0),
        focus: Point::new(vec![0, 0], 1),
    });
    editor.toggle_bold();
    assert_eq!(editor.markup(), "<p>x</p>");
    assert_eq!(seen.borrow().len(), 1);
}

#[test]
fn typing_into_an_empty_paragraph_stays_inside_it() {
    let mut editor = RichTextEditor::new(with_default("<p></p>"), EditorCallbacks::new());
    editor.type_text("x");
    assert_eq!(editor.markup(), "<p>x</p>");
}

#[test]
fn tab_in_an_empty_list_item_nests_it() {
    let mut editor = RichTextEditor::new(with_default("<ul><li></li></ul>"), EditorCallbacks::new());

    assert!(editor.handle_key(KeyPress::tab()));
    assert!(!editor.markup().contains("    "));
    let inner = editor.document().element(&[0, 0]).expect("nested list");
    assert_eq!(inner.tag, "ul");
    assert_eq!(inner.attr(BULLET_STYLE_ATTR), Some("circle"));

    editor.type_text("x");
    assert_eq!(
        editor.document().text_node(&[0, 0, 0, 0]).map(|t| t.text.as_str()),
        Some("x")
    );
}

#[test]
fn emitted_empty_list_can_be_mounted_again() {
    let (callbacks, seen) = recording();
    let mut first = RichTextEditor::new(EditorProps::default(), callbacks);
    first.toggle_list();
    let emitted = seen.borrow().last().expect("change emitted").markup.clone();
    assert!(emitted.ends_with("<li></li></ul>"));

    let mut second = RichTextEditor::new(
        EditorProps {
            value: Some(emitted),
            ..EditorProps::default()
        },
        EditorCallbacks::new(),
    );
    assert!(second.format_state().list_active);
    second.type_text("x");
    assert!(second.markup().ends_with("<li>x</li></ul>"));
}

#[test]
fn html_fragment_lands_inside_an_empty_paragraph() {
    let mut editor = RichTextEditor::new(with_default("<p></p>"), EditorCallbacks::new());
    editor.insert_html("<strong>y</strong>");
    assert_eq!(editor.markup(), "<p><strong>y</strong></p>");
}

#[test]
fn failed_format_query_keeps_previous_flags() {
    let mut reflector = SelectionReflector::new(SurfaceId::next());
    let bold = MemorySurface::from_markup("<p><strong>bold</strong></p>");
    reflector.refresh(&bold);
    assert!(reflector.state().bold);

    let failing = MemorySurface::from_markup(r#"<ul data-bullet-style="star"><li>plain</li></ul>"#)
        .without(NativeCommand::QueryState);
    reflector.refresh(&failing);
    assert!(reflector.state().bold);
    assert!(!reflector.state().list_active);
    assert_eq!(reflector.state().current_bullet_style.as_deref(), Some("star"));
}

#[test]
fn insert_entry_points_do_nothing_while_disabled_in_config() {
    let calls = Rc::new(RefCell::new(0));
    let template_sink = Rc::clone(&calls);
    let html_sink = Rc::clone(&calls);
    let mut props = with_default("<p>hi</p>");
    props.template.markup = "<p>Template</p>".into();
    let mut editor = RichTextEditor::new(
        props,
        EditorCallbacks::new()
            .on_insert_template(move || *template_sink.borrow_mut() += 1)
            .on_open_html(move |_| *html_sink.borrow_mut() += 1),
    );

    editor.dispatch(ToolbarAction::InsertTemplate);
    editor.dispatch(ToolbarAction::OpenHtmlDialog);
    assert_eq!(*calls.borrow(), 0);
    assert!(!editor.dialog().is_open());
    assert_eq!(editor.markup(), "<p>hi</p>");
}

#[test]
fn html_seed_follows_after_debounce() {
    let mut props = with_default("<p>x</p>");
    props.html_insert = HtmlInsert {
        enabled: true,
        seed: "<p>a</p>".into(),
        ..HtmlInsert::default()
    };
    let mut editor = RichTextEditor::new(props, EditorCallbacks::new());

    editor.open_html_dialog();
    editor.cancel_html_dialog();
    assert!(!editor.dialog().is_open());

    let t0 = Instant::now();
    editor.sync_html_seed("<p>b</p>", t0);
    assert!(!editor.tick(t0));
    assert!(editor.tick(t0 + SEED_DEBOUNCE));
    assert_eq!(editor.props().html_insert.seed, "<p>b</p>");

    editor.open_html_dialog();
    assert_eq!(editor.dialog().draft(), "<p>b</p>");
}

#[test]
fn surface_style_and_disabled_flag_follow_props() {
    let mut props = with_default("<p>x</p>");
    props.text_style = TextStyle {
        color: Some("#333".into()),
        font_size: Some("14px".into()),
        ..TextStyle::default()
    };
    let mut editor = RichTextEditor::new(props, EditorCallbacks::new());
    assert_eq!(editor.surface_style(), "color: #333; font-size: 14px;");

    assert!(!editor.is_disabled());
    editor.set_disabled(true);
    assert!(editor.is_disabled());
    assert!(editor.toolbar_controls().iter().all(|c| c.disabled));
}
