// Resource surface
//
// One file per endpoint family, each adding inherent methods to `Client`.
// Reads consult the lab cache when it is enabled; writes keep it coherent.

mod deep;
mod definitions;
mod group;
mod interface;
mod lab;
mod link;
mod node;
mod user;
