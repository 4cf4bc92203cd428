mod writer;

pub use writer::{load_plan, render_plan, PlanWriter, WriteOutcome};
