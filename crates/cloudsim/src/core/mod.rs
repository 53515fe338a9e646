//! Cloud infrastructure model: hosts, virtual machines, cloudlets and their schedulers,
//! datacenters and brokers.

pub mod broker;
pub mod cloudlet;
pub mod cloudlet_scheduler;
pub mod common;
pub mod config;
pub mod datacenter;
pub mod events;
pub mod host;
pub mod id_allocator;
pub mod migration;
pub mod pe;
pub mod provisioner;
pub mod utilization_model;
pub mod vm;
pub mod vm_allocation_policy;
pub mod vm_placement_algorithm;
pub mod vm_placement_algorithms;
pub mod vm_scheduler;
