// Module layout (Clean Architecture style)
// - bootstrap: configuration and startup wiring
// - infrastructure: object stores, file repository, database handle
// - presentation: HTTP handlers and routing
// - application: ports and file use cases
// - domain: file model, naming rules, content types

pub mod application;
pub mod bootstrap;
pub mod domain;
pub mod infrastructure;
pub mod presentation;
