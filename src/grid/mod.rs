pub mod planning;
pub mod projector;
pub mod week;

pub use planning::{BlockForm, PlanError};
pub use projector::{
    project_spans, project_week, DayColumn, GridGeometry, NowIndicator, Slot, SlotContent,
    SlotTiming, Span, SpanKind, WeekGrid,
};
pub use week::{slot_bounds, week_dates, week_start};
