pub mod core;
pub mod extensions;
pub mod openstack;
