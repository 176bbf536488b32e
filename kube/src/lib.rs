//! Crate for interacting with the Kubernetes API
//!
//! This is a thin facade over [`kube_client`] (client, `Api`, discovery),
//! [`kube_core`] (shared types and traits), [`kube_derive`] (the
//! `#[derive(CustomResource)]` macro) and [`kube_runtime`] (reflector,
//! watcher, `Controller`) — each usable standalone, gated here behind the
//! `client`/`derive`/`runtime` features.
//!
//! # Example
//!
//! ```rust,no_run
//! use futures::{StreamExt, TryStreamExt};
//! use kube::api::{Api, ListParams, WatchEvent};
//! use kube::Client;
//! use k8s_openapi::api::core::v1::Pod;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), kube::Error> {
//!     let client = Client::try_default().await?;
//!     let pods: Api<Pod> = Api::namespaced(client, "default");
//!     for p in pods.list(&ListParams::default()).await? {
//!         println!("found pod {}", p.metadata.name.unwrap_or_default());
//!     }
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

#[cfg(feature = "client")] pub use kube_client::{client, config, discovery, Client, Config, Discovery};
#[cfg(feature = "client")] pub use kube_client::{Api, Error, Result};
#[cfg(feature = "client")] pub mod api {
    //! Re-export of [`kube_client::api`].
    pub use kube_client::api::*;
}

pub use kube_core as core;
pub use kube_core::{CustomResourceExt, Resource, ResourceExt};

#[cfg(feature = "derive")]
#[cfg_attr(docsrs, doc(cfg(feature = "derive")))]
pub use kube_derive::CustomResource;

#[cfg(feature = "runtime")]
#[cfg_attr(docsrs, doc(cfg(feature = "runtime")))]
pub mod runtime {
    //! Re-export of [`kube_runtime`].
    pub use kube_runtime::*;
}

