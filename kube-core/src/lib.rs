//! Kube shared types, traits and client-less behavior
//!
//! Home of the CRD types, discovery plumbing and schema helpers that
//! `oracle-operator`'s resource definitions and controllers build on.

#[cfg(feature = "admission")] pub mod admission;

pub mod api_resource;
pub use api_resource::ApiResource;

#[cfg(feature = "ws")] pub mod conversion;

pub mod crd;
pub use crd::CustomResourceExt;

pub mod discovery;

pub mod duration;
pub use duration::Duration;

pub mod dynamic;
pub use dynamic::DynamicObject;

pub mod gvk;
pub use gvk::{GroupVersionKind, GroupVersionResource};

pub mod k8s;

#[cfg(feature = "kubelet-debug")] pub mod kubelet_debug;

pub mod labels;

pub mod metadata;

pub mod node_proxy;

pub mod object;
pub use object::WatchEvent;

pub mod params;

pub mod request;
pub use request::Request;

mod resource;
pub use resource::{Resource, ResourceExt};

pub mod response;

pub mod scope;

#[cfg(feature = "schema")] pub mod schema;

pub mod subresource;

pub mod util;

pub mod version;
pub use version::Version;

pub mod watch;

mod error;
pub use error::{Error, ErrorResponse};
pub type Result<T, E = Error> = std::result::Result<T, E>;
