// Module layout (Clean Architecture style)
// - bootstrap: configuration, wiring and the startup seed
// - infrastructure: DB/storage/crypto/notification adapters
// - presentation: HTTP handlers, guards and routing
// - application: ports, access policy and use cases
// - domain: core models

pub mod application;
pub mod bootstrap;
pub mod domain;
pub mod infrastructure;
pub mod presentation;
