//! CPU bring-up primitives for the ibex kernel
//!
//! Thin, synchronous wrappers over the privileged x86 instructions used during early
//! boot: port-mapped I/O, descriptor-table installation with the forced segment-register
//! refresh, and the task-register load. Nothing here keeps state; every operation is a
//! fixed instruction sequence over caller-owned data.
//!
//! Bad inputs fault in the processor, not in software. None of these operations return
//! errors and none of them catch exceptions; a malformed descriptor table raises #GP
//! exactly as the manuals describe.
#![cfg_attr(not(test), no_std)]

pub mod port;
pub mod segmentation;
pub mod task;
