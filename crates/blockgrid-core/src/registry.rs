//! Block library: defaults for every block kind.

use crate::block::{
    BlockKind, BlockLayout, BlockProps, CalendarProps, ChartProps, EditableTableProps,
    InformationalTableProps, KpiProps, PipelineProps, TextProps, TitleDescriptionProps,
};

/// Library entry for a block kind.
#[derive(Debug, Clone, Copy)]
pub struct BlockSpec {
    pub kind: BlockKind,
    /// Name shown in the block library.
    pub label: &'static str,
    /// Layout given to freshly added blocks.
    pub default_layout: BlockLayout,
}

impl BlockSpec {
    /// Fresh props for a newly added block.
    pub fn create_default_props(&self) -> BlockProps {
        match self.kind {
            BlockKind::Text => default_text(),
            BlockKind::TitleDescription => default_title_description(),
            BlockKind::EditableTable => default_editable_table(),
            BlockKind::InformationalTable => default_informational_table(),
            BlockKind::Calendar => default_calendar(),
            BlockKind::Chart => default_chart(),
            BlockKind::Kpi => default_kpi(),
            BlockKind::Pipeline => default_pipeline(),
        }
    }
}

/// Look up the library entry for `kind`.
pub fn spec(kind: BlockKind) -> BlockSpec {
    let (label, span) = match kind {
        BlockKind::Text => ("Text", 60),
        BlockKind::TitleDescription => ("Title & description", 60),
        BlockKind::EditableTable => ("Editable table", 60),
        BlockKind::InformationalTable => ("Informational table", 60),
        BlockKind::Calendar => ("Calendar", 30),
        BlockKind::Chart => ("Chart", 30),
        BlockKind::Kpi => ("KPI", 15),
        BlockKind::Pipeline => ("Pipeline", 60),
    };
    BlockSpec {
        kind,
        label,
        default_layout: BlockLayout::with_span(span),
    }
}

/// Library entries in display order.
pub fn library() -> Vec<BlockSpec> {
    BlockKind::ALL.into_iter().map(spec).collect()
}

fn default_text() -> BlockProps {
    BlockProps::Text(TextProps::default())
}

fn default_title_description() -> BlockProps {
    BlockProps::TitleDescription(TitleDescriptionProps {
        title: "Title".to_string(),
        ..Default::default()
    })
}

fn default_editable_table() -> BlockProps {
    BlockProps::EditableTable(EditableTableProps {
        columns: ["company_name", "position", "stage", "outcome"]
            .map(String::from)
            .to_vec(),
        ..Default::default()
    })
}

fn default_informational_table() -> BlockProps {
    BlockProps::InformationalTable(InformationalTableProps {
        columns: ["company_name", "stage", "application_date"]
            .map(String::from)
            .to_vec(),
        ..Default::default()
    })
}

fn default_calendar() -> BlockProps {
    BlockProps::Calendar(CalendarProps {
        date_field: "interview_datetime".to_string(),
        ..Default::default()
    })
}

fn default_chart() -> BlockProps {
    BlockProps::Chart(ChartProps {
        chart_type: "bar".to_string(),
        field: "stage".to_string(),
        ..Default::default()
    })
}

fn default_kpi() -> BlockProps {
    BlockProps::Kpi(KpiProps {
        title: "Applications".to_string(),
        metric: "count".to_string(),
        ..Default::default()
    })
}

fn default_pipeline() -> BlockProps {
    BlockProps::Pipeline(PipelineProps {
        stages: ["Applied", "Screening", "HR", "Technical", "Final Interview", "Offer"]
            .map(String::from)
            .to_vec(),
        ..Default::default()
    })
}
