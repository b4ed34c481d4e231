use manos_rich_editor::{
    CommandPort, MemorySurface, NativeCommand, Node, Point, PortError, Selection, to_markup,
};

fn caret(path: Vec<usize>, offset: usize) -> Selection {
    Selection::collapsed(Point::new(path, offset))
}

fn range(anchor: (Vec<usize>, usize), focus: (Vec<usize>, usize)) -> Selection {
    Selection {
        anchor: Point::new(anchor.0, anchor.1),
        focus: Point::new(focus.0, focus.1),
    }
}

#[test]
fn bold_range_splits_and_rejoins_text() -> anyhow::Result<()> {
    let mut surface = MemorySurface::from_markup("<p>abc</p>");
    surface.set_selection(range((vec![0, 0], 0), (vec![0, 0], 2)));

    surface.toggle_bold()?;
    assert_eq!(to_markup(surface.document()), "<p><strong>ab</strong>c</p>");
    assert!(surface.query_active_formats()?.bold);

    surface.toggle_bold()?;
    assert_eq!(to_markup(surface.document()), "<p>abc</p>");
    assert!(!surface.query_active_formats()?.bold);
    Ok(())
}

#[test]
fn partially_bold_range_becomes_fully_bold() -> anyhow::Result<()> {
    let mut surface = MemorySurface::from_markup("<p><strong>ab</strong>cd</p>");
    surface.set_selection(range((vec![0, 0], 0), (vec![0, 1], 2)));

    surface.toggle_bold()?;
    assert_eq!(to_markup(surface.document()), "<p><strong>abcd</strong></p>");
    Ok(())
}

#[test]
fn caret_toggle_applies_to_next_typed_text() -> anyhow::Result<()> {
    let mut surface = MemorySurface::from_markup("<p>ab</p>");
    surface.set_selection(caret(vec![0, 0], 2));

    surface.toggle_italic()?;
    assert!(surface.query_active_formats()?.italic);
    assert_eq!(to_markup(surface.document()), "<p>ab</p>");

    surface.insert_text("c")?;
    surface.insert_text("d")?;
    assert_eq!(to_markup(surface.document()), "<p>ab<em>cd</em></p>");
    Ok(())
}

#[test]
fn moving_the_caret_drops_pending_marks() -> anyhow::Result<()> {
    let mut surface = MemorySurface::from_markup("<p>abc</p>");
    surface.set_selection(caret(vec![0, 0], 3));
    surface.toggle_bold()?;
    assert!(surface.pending_marks().is_some());

    surface.set_selection(caret(vec![0, 0], 1));
    assert!(surface.pending_marks().is_none());
    surface.insert_text("x")?;
    assert_eq!(to_markup(surface.document()), "<p>axbc</p>");
    Ok(())
}

#[test]
fn color_on_range() -> anyhow::Result<()> {
    let mut surface = MemorySurface::from_markup("<p>hello</p>");
    surface.set_selection(range((vec![0, 0], 0), (vec![0, 0], 5)));
    surface.set_foreground_color("#ff0000")?;
    assert_eq!(
        to_markup(surface.document()),
        r##"<p><span style="color: #ff0000;">hello</span></p>"##
    );
    Ok(())
}

#[test]
fn toggle_list_wraps_and_unwraps_paragraph() -> anyhow::Result<()> {
    let mut surface = MemorySurface::from_markup("<p>one</p>");
    surface.set_selection(caret(vec![0, 0], 3));

    surface.toggle_list()?;
    assert_eq!(to_markup(surface.document()), "<ul><li>one</li></ul>");
    assert!(surface.query_active_formats()?.unordered_list);
    assert_eq!(surface.selection().focus, Point::new(vec![0, 0, 0], 3));

    surface.toggle_list()?;
    assert_eq!(to_markup(surface.document()), "<p>one</p>");
    assert!(!surface.query_active_formats()?.unordered_list);
    assert_eq!(surface.selection().focus, Point::new(vec![0, 0], 3));
    Ok(())
}

#[test]
fn toggle_list_over_two_paragraphs_makes_two_items() -> anyhow::Result<()> {
    let mut surface = MemorySurface::from_markup("<p>a</p><p>b</p><p>c</p>");
    surface.set_selection(range((vec![0, 0], 0), (vec![1, 0], 1)));

    surface.toggle_list()?;
    assert_eq!(
        to_markup(surface.document()),
        "<ul><li>a</li><li>b</li></ul><p>c</p>"
    );
    Ok(())
}

#[test]
fn unlisting_a_middle_item_splits_the_list() -> anyhow::Result<()> {
    let mut surface = MemorySurface::from_markup("<ul><li>a</li><li>b</li><li>c</li></ul>");
    surface.set_selection(caret(vec![0, 1, 0], 0));

    surface.toggle_list()?;
    assert_eq!(
        to_markup(surface.document()),
        "<ul><li>a</li></ul><p>b</p><ul><li>c</li></ul>"
    );
    Ok(())
}

#[test]
fn ordered_list_is_converted_in_place() -> anyhow::Result<()> {
    let mut surface = MemorySurface::from_markup("<ol><li>a</li><li>b</li></ol>");
    surface.set_selection(caret(vec![0, 1, 0], 1));

    surface.toggle_list()?;
    assert_eq!(to_markup(surface.document()), "<ul><li>a</li><li>b</li></ul>");
    Ok(())
}

#[test]
fn toggle_list_on_empty_surface_creates_a_list() -> anyhow::Result<()> {
    let mut surface = MemorySurface::new();
    surface.toggle_list()?;
    surface.insert_text("first")?;
    assert_eq!(to_markup(surface.document()), "<ul><li>first</li></ul>");
    Ok(())
}

#[test]
fn indent_nests_under_previous_item_and_outdent_restores() -> anyhow::Result<()> {
    let mut surface = MemorySurface::from_markup("<ul><li>one</li><li>two</li></ul>");
    surface.set_selection(caret(vec![0, 1, 0], 1));

    surface.indent()?;
    assert_eq!(
        to_markup(surface.document()),
        "<ul><li>one<ul><li>two</li></ul></li></ul>"
    );
    assert_eq!(surface.selection().focus, Point::new(vec![0, 0, 1, 0, 0], 1));

    surface.outdent()?;
    assert_eq!(to_markup(surface.document()), "<ul><li>one</li><li>two</li></ul>");
    assert_eq!(surface.selection().focus, Point::new(vec![0, 1, 0], 1));
    Ok(())
}

#[test]
fn indent_joins_existing_sublist() -> anyhow::Result<()> {
    let mut surface =
        MemorySurface::from_markup("<ul><li>one<ul><li>a</li></ul></li><li>two</li></ul>");
    surface.set_selection(caret(vec![0, 1, 0], 0));

    surface.indent()?;
    assert_eq!(
        to_markup(surface.document()),
        "<ul><li>one<ul><li>a</li><li>two</li></ul></li></ul>"
    );
    Ok(())
}

#[test]
fn outdent_carries_following_siblings() -> anyhow::Result<()> {
    let mut surface = MemorySurface::from_markup(
        "<ul><li>one<ul><li>a</li><li>b</li><li>c</li></ul></li></ul>",
    );
    surface.set_selection(caret(vec![0, 0, 1, 1, 0], 0));

    surface.outdent()?;
    assert_eq!(
        to_markup(surface.document()),
        "<ul><li>one<ul><li>a</li></ul></li><li>b<ul><li>c</li></ul></li></ul>"
    );
    assert_eq!(surface.selection().focus, Point::new(vec![0, 1, 0], 0));
    Ok(())
}

#[test]
fn outdent_of_top_level_item_becomes_paragraph() -> anyhow::Result<()> {
    let mut surface = MemorySurface::from_markup("<ul><li>only</li></ul>");
    surface.set_selection(caret(vec![0, 0, 0], 2));
    surface.outdent()?;
    assert_eq!(to_markup(surface.document()), "<p>only</p>");
    Ok(())
}

#[test]
fn indent_outside_a_list_does_nothing() -> anyhow::Result<()> {
    let mut surface = MemorySurface::from_markup("<p>text</p>");
    surface.indent()?;
    assert_eq!(to_markup(surface.document()), "<p>text</p>");
    assert!(!surface.session().can_undo());
    Ok(())
}

#[test]
fn backspace_removes_previous_character() -> anyhow::Result<()> {
    let mut surface = MemorySurface::from_markup("<p>h\u{e9}</p>");
    surface.delete_backward()?;
    assert_eq!(to_markup(surface.document()), "<p>h</p>");
    assert_eq!(surface.selection().focus, Point::new(vec![0, 0], 1));
    Ok(())
}

#[test]
fn backspace_at_item_start_lifts_it_out() -> anyhow::Result<()> {
    let mut surface = MemorySurface::from_markup("<ul><li>a</li><li>b</li></ul>");
    surface.set_selection(caret(vec![0, 1, 0], 0));
    surface.delete_backward()?;
    assert_eq!(to_markup(surface.document()), "<ul><li>a</li></ul><p>b</p>");
    Ok(())
}

#[test]
fn typing_replaces_selected_text() -> anyhow::Result<()> {
    let mut surface = MemorySurface::from_markup("<p>hello world</p>");
    surface.set_selection(range((vec![0, 0], 6), (vec![0, 0], 11)));
    surface.insert_text("there")?;
    assert_eq!(to_markup(surface.document()), "<p>hello there</p>");
    assert_eq!(surface.selection().focus, Point::new(vec![0, 0], 11));
    Ok(())
}

#[test]
fn inline_markup_is_spliced_at_caret() -> anyhow::Result<()> {
    let mut surface = MemorySurface::from_markup("<p>ac</p>");
    surface.set_selection(caret(vec![0, 0], 1));
    surface.insert_raw_markup("<strong>b</strong>")?;
    assert_eq!(to_markup(surface.document()), "<p>a<strong>b</strong>c</p>");
    Ok(())
}

#[test]
fn block_markup_goes_after_current_block() -> anyhow::Result<()> {
    let mut surface = MemorySurface::from_markup("<p>one</p><p>three</p>");
    surface.set_selection(caret(vec![0, 0], 1));
    surface.insert_raw_markup("<p>two</p>")?;
    assert_eq!(
        to_markup(surface.document()),
        "<p>one</p><p>two</p><p>three</p>"
    );
    assert_eq!(surface.selection().focus, Point::new(vec![1, 0], 3));
    Ok(())
}

#[test]
fn block_markup_inside_list_goes_after_the_list() -> anyhow::Result<()> {
    let mut surface = MemorySurface::from_markup("<ul><li>a<ul><li>b</li></ul></li></ul>");
    surface.set_selection(caret(vec![0, 0, 1, 0, 0], 1));
    surface.insert_raw_markup("<p>after</p>")?;
    assert_eq!(
        to_markup(surface.document()),
        "<ul><li>a<ul><li>b</li></ul></li></ul><p>after</p>"
    );
    Ok(())
}

#[test]
fn unavailable_commands_report_errors() {
    let mut surface = MemorySurface::from_markup("<p>x</p>")
        .without(NativeCommand::Bold)
        .rejecting(NativeCommand::InsertHtml);

    assert!(matches!(
        surface.toggle_bold(),
        Err(PortError::Unavailable(NativeCommand::Bold))
    ));
    assert!(matches!(
        surface.insert_raw_markup("<p>y</p>"),
        Err(PortError::Rejected {
            command: NativeCommand::InsertHtml,
            ..
        })
    ));
    assert_eq!(to_markup(surface.document()), "<p>x</p>");
}

#[test]
fn undo_and_redo_walk_history() -> anyhow::Result<()> {
    let mut surface = MemorySurface::from_markup("<p>ab</p>");
    surface.insert_text("c")?;
    surface.toggle_list()?;
    assert_eq!(to_markup(surface.document()), "<ul><li>abc</li></ul>");

    assert!(surface.undo());
    assert_eq!(to_markup(surface.document()), "<p>abc</p>");
    assert!(surface.undo());
    assert_eq!(to_markup(surface.document()), "<p>ab</p>");
    assert!(!surface.undo());

    assert!(surface.redo());
    assert_eq!(to_markup(surface.document()), "<p>abc</p>");
    Ok(())
}

#[test]
fn replace_document_resets_history() {
    let mut surface = MemorySurface::from_markup("<p>ab</p>");
    surface.insert_text("c").unwrap();
    surface.replace_document(manos_rich_editor::Document::new(vec![Node::paragraph("new")]));
    assert!(!surface.undo());
    assert_eq!(surface.selection().focus, Point::new(vec![0, 0], 3));
}
