//! BlockGrid Core Library
//!
//! Platform-agnostic core of the grid page builder: the block model, grid packing,
//! drag reordering, and page config persistence.

pub mod block;
pub mod clock;
pub mod config_store;
pub mod drag;
pub mod editor;
pub mod layout;
pub mod normalize;
pub mod page;
pub mod registry;
pub mod settings;
pub mod storage;
pub mod timestamp;

pub use block::{Block, BlockKind, BlockLayout, BlockProps};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config_store::{ConfigStore, FlushOutcome, FlushStep, PendingSave, StoreOptions};
pub use drag::{DragConfig, DragController, DragPhase, DragPreview, DropOutcome, PointerInput, ViewportGeometry};
pub use editor::{EditorError, EditorResult, GridCell, PageEditor};
pub use layout::{GRID_COLUMNS, GridTracks, PackItem, PackedItem, Placement, allowed_column_starts, pack, snap_col_start};
pub use normalize::normalize_page_config;
pub use page::{PAGE_CONFIG_VERSION, PageConfig};
pub use settings::{MemorySettings, Settings, SettingsBackend, merge_page_configs};
pub use storage::{
    LOCAL_CACHE_KEY, LocalCache, MemoryCache, PageCache, PlatformCache, StorageError, StorageResult,
    create_default_cache,
};
