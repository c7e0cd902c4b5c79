//! Block definitions for pages.

use crate::layout::{GRID_COLUMNS, Placement, clamp_span, snap_col_start};
use crate::registry;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Closed set of block kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BlockKind {
    Text,
    TitleDescription,
    EditableTable,
    InformationalTable,
    Calendar,
    Chart,
    Kpi,
    Pipeline,
}

impl BlockKind {
    /// Every block kind, in library order.
    pub const ALL: [BlockKind; 8] = [
        BlockKind::Text,
        BlockKind::TitleDescription,
        BlockKind::EditableTable,
        BlockKind::InformationalTable,
        BlockKind::Calendar,
        BlockKind::Chart,
        BlockKind::Kpi,
        BlockKind::Pipeline,
    ];

    /// Wire name of the kind (the `type` field).
    pub fn as_str(self) -> &'static str {
        match self {
            BlockKind::Text => "text",
            BlockKind::TitleDescription => "titleDescription",
            BlockKind::EditableTable => "editableTable",
            BlockKind::InformationalTable => "informationalTable",
            BlockKind::Calendar => "calendar",
            BlockKind::Chart => "chart",
            BlockKind::Kpi => "kpi",
            BlockKind::Pipeline => "pipeline",
        }
    }

    /// Parse a wire name. Unknown names yield `None`.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }
}

/// Position and width of a block on the page grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockLayout {
    pub col_span: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub col_start: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_start: Option<u32>,
}

impl BlockLayout {
    /// Unplaced layout with the given span (clamped into the grid).
    pub fn with_span(span: u32) -> Self {
        Self {
            col_span: span.clamp(1, GRID_COLUMNS),
            col_start: None,
            row_start: None,
        }
    }

    /// Rebuild a layout from loosely typed numbers, enforcing the grid constraints.
    pub fn sanitized(col_span: f64, col_start: Option<f64>, row_start: Option<f64>) -> Self {
        let col_span = clamp_span(col_span, GRID_COLUMNS);
        Self {
            col_span,
            col_start: col_start
                .filter(|c| c.is_finite())
                .map(|c| snap_col_start(c, col_span, GRID_COLUMNS)),
            row_start: row_start
                .filter(|r| r.is_finite())
                .map(|r| r.round().max(1.0) as u32),
        }
    }

    /// The packed cell, if the block has been placed.
    pub fn placement(&self) -> Option<Placement> {
        Some(Placement {
            col_start: self.col_start?,
            row_start: self.row_start?,
            col_span: self.col_span,
        })
    }

    pub fn place(&mut self, placement: Placement) {
        self.col_span = placement.col_span;
        self.col_start = Some(placement.col_start);
        self.row_start = Some(placement.row_start);
    }
}

macro_rules! props_record {
    ($(#[$doc:meta])* $name:ident { $($(#[$fdoc:meta])* $field:ident : $ty:ty),* $(,)? }) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
        #[serde(default, rename_all = "camelCase")]
        pub struct $name {
            $($(#[$fdoc])* pub $field: $ty,)*
            /// Fields this version does not model, kept for round-tripping.
            #[serde(flatten)]
            pub extra: Map<String, Value>,
        }
    };
}

props_record!(
    /// Free-form rich text.
    TextProps { text: String }
);
props_record!(
    /// Heading with a short description underneath.
    TitleDescriptionProps { title: String, description: String }
);
props_record!(
    /// Table whose cells the user edits in place.
    EditableTableProps { title: String, columns: Vec<String> }
);
props_record!(
    /// Read-only table over the application list.
    InformationalTableProps { title: String, columns: Vec<String> }
);
props_record!(CalendarProps {
    title: String,
    date_field: String,
});
props_record!(ChartProps {
    title: String,
    chart_type: String,
    field: String,
});
props_record!(KpiProps {
    title: String,
    metric: String,
});
props_record!(PipelineProps {
    title: String,
    stages: Vec<String>,
});

/// Type-specific properties of a block, one variant per kind.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockProps {
    Text(TextProps),
    TitleDescription(TitleDescriptionProps),
    EditableTable(EditableTableProps),
    InformationalTable(InformationalTableProps),
    Calendar(CalendarProps),
    Chart(ChartProps),
    Kpi(KpiProps),
    Pipeline(PipelineProps),
}

impl BlockProps {
    pub fn kind(&self) -> BlockKind {
        match self {
            BlockProps::Text(_) => BlockKind::Text,
            BlockProps::TitleDescription(_) => BlockKind::TitleDescription,
            BlockProps::EditableTable(_) => BlockKind::EditableTable,
            BlockProps::InformationalTable(_) => BlockKind::InformationalTable,
            BlockProps::Calendar(_) => BlockKind::Calendar,
            BlockProps::Chart(_) => BlockKind::Chart,
            BlockProps::Kpi(_) => BlockKind::Kpi,
            BlockProps::Pipeline(_) => BlockKind::Pipeline,
        }
    }

    /// Decode a prop bag for `kind`. A missing (`null`) bag decodes to empty props.
    pub fn from_value(kind: BlockKind, value: Value) -> Result<Self, serde_json::Error> {
        let value = match value {
            Value::Null => Value::Object(Map::new()),
            other => other,
        };
        Ok(match kind {
            BlockKind::Text => BlockProps::Text(serde_json::from_value(value)?),
            BlockKind::TitleDescription => {
                BlockProps::TitleDescription(serde_json::from_value(value)?)
            }
            BlockKind::EditableTable => BlockProps::EditableTable(serde_json::from_value(value)?),
            BlockKind::InformationalTable => {
                BlockProps::InformationalTable(serde_json::from_value(value)?)
            }
            BlockKind::Calendar => BlockProps::Calendar(serde_json::from_value(value)?),
            BlockKind::Chart => BlockProps::Chart(serde_json::from_value(value)?),
            BlockKind::Kpi => BlockProps::Kpi(serde_json::from_value(value)?),
            BlockKind::Pipeline => BlockProps::Pipeline(serde_json::from_value(value)?),
        })
    }

    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

impl Serialize for BlockProps {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            BlockProps::Text(p) => p.serialize(serializer),
            BlockProps::TitleDescription(p) => p.serialize(serializer),
            BlockProps::EditableTable(p) => p.serialize(serializer),
            BlockProps::InformationalTable(p) => p.serialize(serializer),
            BlockProps::Calendar(p) => p.serialize(serializer),
            BlockProps::Chart(p) => p.serialize(serializer),
            BlockProps::Kpi(p) => p.serialize(serializer),
            BlockProps::Pipeline(p) => p.serialize(serializer),
        }
    }
}

/// Wire shape of a block: `{ id, type, layout, props }`.
#[derive(Deserialize)]
struct RawBlock {
    id: String,
    #[serde(rename = "type")]
    kind: BlockKind,
    layout: BlockLayout,
    #[serde(default)]
    props: Value,
}

impl TryFrom<RawBlock> for Block {
    type Error = serde_json::Error;

    fn try_from(raw: RawBlock) -> Result<Self, Self::Error> {
        Ok(Block {
            id: raw.id,
            layout: raw.layout,
            props: BlockProps::from_value(raw.kind, raw.props)?,
        })
    }
}

/// One visual unit on a page.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawBlock")]
pub struct Block {
    /// Unique within a page and stable across edits.
    pub id: String,
    pub layout: BlockLayout,
    pub props: BlockProps,
}

impl Serialize for Block {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Block", 4)?;
        state.serialize_field("id", &self.id)?;
        state.serialize_field("type", &self.kind())?;
        state.serialize_field("layout", &self.layout)?;
        state.serialize_field("props", &self.props)?;
        state.end()
    }
}

impl Block {
    /// Create a block of `kind` with a fresh id and the registry defaults.
    pub fn new(kind: BlockKind) -> Self {
        let spec = registry::spec(kind);
        Self {
            id: Uuid::new_v4().to_string(),
            layout: spec.default_layout,
            props: spec.create_default_props(),
        }
    }

    /// Create a block with an explicit id.
    pub fn with_id(id: impl Into<String>, kind: BlockKind) -> Self {
        Self {
            id: id.into(),
            ..Self::new(kind)
        }
    }

    pub fn with_span(mut self, span: u32) -> Self {
        self.layout = BlockLayout::with_span(span);
        self
    }

    pub fn kind(&self) -> BlockKind {
        self.props.kind()
    }

    pub fn span(&self) -> u32 {
        self.layout.col_span
    }

    /// Copy of this block under a fresh id. The copy is unplaced.
    pub fn duplicate(&self) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            layout: BlockLayout::with_span(self.layout.col_span),
            props: self.props.clone(),
        }
    }

    /// Shallow-merge `patch` into the props. On a type mismatch the props are left as they were.
    pub fn patch_props(&mut self, patch: &Map<String, Value>) -> Result<(), serde_json::Error> {
        let mut current = match self.props.to_value()? {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        for (key, value) in patch {
            current.insert(key.clone(), value.clone());
        }
        self.props = BlockProps::from_value(self.kind(), Value::Object(current))?;
        Ok(())
    }
}
