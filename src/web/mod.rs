//! Handler registration, argument binding and reply normalization on top of axum.

pub mod dispatch;
pub mod handler;
pub mod reply;
pub mod routes;
pub mod signature;
pub mod template;

pub use handler::{CallArgs, Handler, RequestContext};
pub use reply::{normalize, Reply, TemplateRenderer, TEMPLATE_KEY};
pub use routes::{get, post, RouteDef, RouteEntry, RouteMethod, RouteTable};
pub use signature::{inspect, Classification, Param, ParamKind, Signature, REQUEST_PARAM};
pub use template::Templates;
