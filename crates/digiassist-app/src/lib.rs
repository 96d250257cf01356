// Application layer: screen routing, the orchestrating event loop, and the
// messages it exchanges with the presentation layer.

pub mod app;
pub mod protocol;
pub mod report;
