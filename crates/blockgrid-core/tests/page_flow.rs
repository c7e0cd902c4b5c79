//! End-to-end editing flows: editor, drag controller and config store together.

use blockgrid_core::settings::BoxFuture;
use blockgrid_core::{
    Block, BlockKind, ConfigStore, DragConfig, DragPhase, FlushOutcome, FlushStep, GridCell,
    ManualClock, MemoryCache, MemorySettings, PageConfig, PageEditor, PointerInput, Settings,
    SettingsBackend, StoreOptions, ViewportGeometry,
};
use chrono::{TimeZone, Utc};
use kurbo::Rect;
use pollster::block_on;
use std::cell::RefCell;
use std::future::{Future, poll_fn};
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll, Waker};

/// Grid of 60 tracks, 10px wide, no gap; each row is 100px tall.
struct Viewport {
    rects: Vec<(String, Rect)>,
    scrolled: f64,
}

impl Viewport {
    fn from_cells(cells: &[GridCell]) -> Self {
        let rects = cells
            .iter()
            .map(|cell| {
                let p = cell.placement;
                let x = f64::from(p.col_start - 1) * 10.0;
                let y = f64::from(p.row_start - 1) * 100.0;
                (cell.id.clone(), Rect::new(x, y, x + f64::from(p.col_span) * 10.0, y + 90.0))
            })
            .collect();
        Self { rects, scrolled: 0.0 }
    }
}

impl ViewportGeometry for Viewport {
    fn container_rect(&self) -> Option<Rect> {
        Some(Rect::new(0.0, 0.0, 600.0, 1000.0))
    }

    fn block_rects(&self) -> Vec<(String, Rect)> {
        self.rects.clone()
    }

    fn viewport_height(&self) -> f64 {
        1000.0
    }

    fn scroll_by(&mut self, dy: f64) {
        self.scrolled += dy;
    }
}

/// Remote store whose saves stay pending until the gate opens.
#[derive(Default)]
struct GatedSettings {
    inner: MemorySettings,
    open: AtomicBool,
}

impl SettingsBackend for GatedSettings {
    fn save_settings(&self, patch: Settings) -> BoxFuture<'_, Option<Settings>> {
        Box::pin(async move {
            poll_fn(|_| {
                if self.open.load(Ordering::SeqCst) {
                    Poll::Ready(())
                } else {
                    Poll::Pending
                }
            })
            .await;
            self.inner.save_settings(patch).await
        })
    }
}

struct Session<B: SettingsBackend = MemorySettings> {
    editor: PageEditor<B, MemoryCache>,
    remote: Arc<B>,
    clock: Arc<ManualClock>,
}

fn session() -> Session {
    session_with(Arc::new(MemorySettings::new()))
}

fn session_with<B: SettingsBackend>(remote: Arc<B>) -> Session<B> {
    let clock = Arc::new(ManualClock::starting_at(
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
    ));
    let store = ConfigStore::new(
        PageConfig::new("applications"),
        remote.clone(),
        Arc::new(MemoryCache::new()),
        clock.clone(),
        StoreOptions::default(),
    );
    let drag = DragConfig {
        grid_gap: 0.0,
        ..DragConfig::default()
    };
    let mut editor = PageEditor::new(store, drag);
    editor.start(Settings::default());
    Session {
        editor,
        remote,
        clock,
    }
}

fn cell_of<B: SettingsBackend>(editor: &PageEditor<B, MemoryCache>, id: &str) -> (u32, u32) {
    let block = editor.page().block(id).unwrap();
    (block.layout.row_start.unwrap(), block.layout.col_start.unwrap())
}

/// Add a span-60 block, then two span-20 blocks preferring the same column.
fn stacked_page<B: SettingsBackend>(s: &mut Session<B>) -> (String, String, String) {
    let a = s.editor.add_block(BlockKind::Text);
    let b = s.editor.insert_block(Block::new(BlockKind::Kpi).with_span(20), None);
    let c = s.editor.insert_block(Block::new(BlockKind::Kpi).with_span(20), None);
    (a, b, c)
}

#[test]
fn added_blocks_stack_under_each_other() {
    let mut s = session();
    let (a, b, c) = stacked_page(&mut s);

    assert_eq!(cell_of(&s.editor, &a), (1, 1));
    assert_eq!(cell_of(&s.editor, &b), (2, 1));
    assert_eq!(cell_of(&s.editor, &c), (3, 1));
}

#[test]
fn dragging_a_block_beside_another_moves_it() {
    let mut s = session();
    let (_, b, c) = stacked_page(&mut s);
    let mut viewport = Viewport::from_cells(&s.editor.render_cells());

    // Grab c (row 3) 10px in, drag it up into row 2 and right to column 21.
    assert!(s.editor.pointer_down(PointerInput::new(1, 10.0, 250.0), &c, &viewport));
    assert!(s.editor.pointer_move(PointerInput::new(1, 215.0, 160.0), &mut viewport));

    let preview: Vec<_> = s.editor.render_cells();
    let placeholder = preview.iter().find(|cell| cell.placeholder).unwrap();
    assert_eq!(placeholder.id, c);
    assert_eq!(placeholder.grid_column(), "21 / span 20");
    assert_eq!(placeholder.grid_row(), "2");
    assert!(s.editor.ghost().is_some());

    assert!(s.editor.pointer_up(PointerInput::new(1, 215.0, 160.0)));
    assert_eq!(cell_of(&s.editor, &b), (2, 1));
    assert_eq!(cell_of(&s.editor, &c), (2, 21));
    assert!(s.editor.render_cells().iter().all(|cell| !cell.placeholder));
}

#[test]
fn dropping_outside_leaves_the_page_untouched() {
    let mut s = session();
    let (_, _, c) = stacked_page(&mut s);
    let before = s.editor.page().clone();
    let mut viewport = Viewport::from_cells(&s.editor.render_cells());

    s.editor.pointer_down(PointerInput::new(1, 10.0, 250.0), &c, &viewport);
    s.editor.pointer_move(PointerInput::new(1, 900.0, 250.0), &mut viewport);
    assert!(!s.editor.pointer_up(PointerInput::new(1, 900.0, 250.0)));
    assert_eq!(s.editor.page(), &before);
}

#[test]
fn rapid_edits_reach_the_remote_once() {
    let mut s = session();
    s.clock.advance_ms(300);
    assert_eq!(block_on(s.editor.tick()), FlushOutcome::Saved);
    let saves_after_seed = s.remote.save_count();

    let (a, _, _) = stacked_page(&mut s);
    s.editor.resize_block(&a, 30.0).unwrap();
    assert_eq!(block_on(s.editor.tick()), FlushOutcome::Idle);

    s.clock.advance_ms(260);
    assert_eq!(block_on(s.editor.tick()), FlushOutcome::Saved);
    assert_eq!(s.remote.save_count(), saves_after_seed + 1);

    let stored: PageConfig =
        serde_json::from_value(s.remote.snapshot().page_configs["applications"].clone()).unwrap();
    assert_eq!(&stored, s.editor.page());
}

#[test]
fn stale_remote_echo_keeps_newer_edit() {
    let mut s = session();
    s.clock.advance_ms(300);
    block_on(s.editor.tick());
    let stale = s.remote.snapshot();

    s.clock.advance_ms(1_000);
    s.editor.add_block(BlockKind::Chart);
    let edited = s.editor.store().local_json().to_string();

    s.editor.settings_changed(stale);
    assert_eq!(s.editor.store().local_json(), edited);
    assert!(s.editor.store().has_pending_flush());

    assert_eq!(block_on(s.editor.on_page_hide()), FlushOutcome::Saved);
    let stored: PageConfig =
        serde_json::from_value(s.remote.snapshot().page_configs["applications"].clone()).unwrap();
    assert_eq!(&stored, s.editor.page());
}

#[test]
fn dispose_flushes_last_edit() {
    let mut s = session();
    s.editor.add_block(BlockKind::Pipeline);
    let remote = s.remote.clone();
    assert_eq!(block_on(s.editor.dispose()), FlushOutcome::Saved);
    let stored = &remote.snapshot().page_configs["applications"];
    assert_eq!(stored["blocks"][0]["type"], "pipeline");
}

#[test]
fn editing_continues_while_a_save_is_pending() {
    let mut s = session_with(Arc::new(GatedSettings::default()));
    let (_, b, c) = stacked_page(&mut s);
    let mut viewport = Viewport::from_cells(&s.editor.render_cells());
    assert!(s.editor.pointer_down(PointerInput::new(1, 10.0, 250.0), &c, &viewport));
    assert!(s.editor.pointer_move(PointerInput::new(1, 215.0, 160.0), &mut viewport));

    let remote = s.remote.clone();
    let clock = s.clock.clone();
    let editor = Rc::new(RefCell::new(s.editor));

    clock.advance_ms(260);
    let FlushStep::Save(save) = editor.borrow_mut().store_mut().begin_due_flush() else {
        panic!("expected a write");
    };
    let mut sending = Box::pin(save.send());
    let mut cx = Context::from_waker(Waker::noop());
    assert!(sending.as_mut().poll(&mut cx).is_pending());

    // The editor is free while the remote store has not answered.
    assert!(editor.try_borrow_mut().unwrap().pointer_up(PointerInput::new(1, 215.0, 160.0)));
    let added = editor.try_borrow_mut().unwrap().add_block(BlockKind::Chart);
    {
        let editor = editor.borrow();
        assert_eq!(editor.drag().phase(), DragPhase::Idle);
        assert_eq!(cell_of(&*editor, &b), (2, 1));
        assert_eq!(cell_of(&*editor, &c), (2, 21));
        assert!(editor.page().block(&added).is_some());
    }

    remote.open.store(true, Ordering::SeqCst);
    let Poll::Ready(result) = sending.as_mut().poll(&mut cx) else {
        panic!("save should finish once the gate opens");
    };
    drop(sending);
    let outcome = editor.borrow_mut().store_mut().complete_flush(save, result);
    assert_eq!(outcome, FlushOutcome::Saved);

    let mut editor = editor.borrow_mut();
    assert!(editor.store().has_pending_flush());
    assert!(editor.pointer_down(PointerInput::new(2, 10.0, 150.0), &b, &viewport));

    clock.advance_ms(260);
    assert_eq!(block_on(editor.tick()), FlushOutcome::Saved);
    let stored: PageConfig =
        serde_json::from_value(remote.inner.snapshot().page_configs["applications"].clone()).unwrap();
    assert_eq!(&stored, editor.page());
}
