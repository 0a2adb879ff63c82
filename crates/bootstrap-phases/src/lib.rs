//! The phases of the node join workflow and the contracts they rely on.
//!
//! Phases never talk to the outside world themselves. Certificate generation,
//! kubeconfig and manifest rendering, certificate download and client
//! construction are delegated to the [collaborators](collaborators) the caller
//! wires in. The shared run context is described by the capability traits in
//! [`data`].

pub mod collaborators;
pub mod constants;
pub mod data;
pub mod flags;
pub mod join;
