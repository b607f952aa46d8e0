//! # brkalloc - A First-Fit `malloc` Replacement
//!
//! This crate provides a drop-in replacement for `malloc`, `free`, `realloc`
//! and `calloc` that manages memory on the program break with `sbrk(2)`.
//!
//! ## Overview
//!
//! Every allocation is a block threaded onto one singly linked chain in the
//! order blocks were created:
//!
//! ```text
//!   Heap Layout:
//!
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │                         HEAP MEMORY                                  │
//!   │                                                                      │
//!   │   ┌─────┬─────┬─────┬─────┬───────────────────────────────────────┐  │
//!   │   │ B1  │ B2  │ B3  │ B4  │            Free Space                 │  │
//!   │   └──┬──┴──▲──┴─────┴─────┴───────────────────────────────────────┘  │
//!   │      └─────┘ next ...     ▲                                     ▲    │
//!   │                           │                                     │    │
//!   │                        Cursor                                  Top   │
//!   │                     (next carve)                            of break │
//!   │                                                                      │
//!   └──────────────────────────────────────────────────────────────────────┘
//!
//!   Freed blocks stay in the chain and are handed out again first-fit.
//!   The break only ever grows: 64 KiB at a time, or exactly one block
//!   when that block is larger.
//! ```
//!
//! ## Crate Structure
//!
//! ```text
//!   brkalloc
//!   ├── align      - Alignment macros (align!, align_down!)
//!   ├── block      - Block header and payload arithmetic (internal)
//!   ├── config     - Chunk size and the DEBUG_MALLOC toggle
//!   ├── directory  - Creation-ordered block chain, first-fit search (internal)
//!   ├── error      - HeapError
//!   ├── growth     - Break trait, Sbrk, FixedBreak, HeapGrowth
//!   ├── heap       - Heap state, introspection (internal)
//!   ├── allocate   - allocate / zero_allocate (internal)
//!   ├── deallocate - deallocate (internal)
//!   ├── reshape    - reallocate (internal)
//!   ├── trace      - Non-allocating call traces
//!   ├── global     - Locked process heap, malloc/free/realloc/calloc, Brkalloc
//!   └── ffi        - C symbols, `preload` feature only (internal)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! fn main() {
//!     unsafe {
//!         let ptr = brkalloc::malloc(8) as *mut u64;
//!         *ptr = 42;
//!         println!("Value: {}", *ptr);
//!
//!         let ptr = brkalloc::realloc(ptr as *mut u8, 64);
//!         brkalloc::free(ptr);
//!     }
//! }
//! ```
//!
//! To replace the allocator of an existing C program, build with the
//! `preload` feature and inject the `cdylib`:
//!
//! ```bash,ignore
//! cargo build --release --features preload
//! DEBUG_MALLOC=1 LD_PRELOAD=target/release/libbrkalloc.so ls
//! ```
//!
//! ## How It Works
//!
//! ```text
//!   Single Block:
//!   ┌───────────────────────┬─────────┬────────────────────────────────┐
//!   │    Block Header       │ padding │         User Data              │
//!   │  ┌─────────────────┐  │         │                                │
//!   │  │ size: N         │  │         │  ┌──────────────────────────┐  │
//!   │  │ is_free: false  │  │         │  │     N bytes usable       │  │
//!   │  │ next: null/ptr  │  │         │  └──────────────────────────┘  │
//!   │  └─────────────────┘  │         │                                │
//!   └───────────────────────┴─────────┴────────────────────────────────┘
//!   ▲ 16-aligned                      ▲ 16-aligned
//!                                     └── Pointer returned to user
//! ```
//!
//! The header and the payload are rounded up to 16 bytes independently,
//! which is what lets `free` walk a payload pointer back to its header:
//! step back one header and round down.
//!
//! ## Limitations
//!
//! - **No coalescing**: adjacent free blocks are never merged
//! - **No size classes**: one chain, searched linearly
//! - **No validation**: double frees and foreign pointers are not detected
//! - **Memory is never returned** to the operating system
//! - **Unix-only**: requires `libc` and `sbrk`
//!
//! ## Safety
//!
//! Freeing or resizing a pointer that did not come from this allocator reads
//! unrelated bytes as block metadata. All entry points that take a pointer
//! are `unsafe`.

pub mod align;
mod allocate;
mod block;
pub mod config;
mod deallocate;
mod directory;
pub mod error;
#[cfg(feature = "preload")]
mod ffi;

#[cfg(all(feature = "preload", not(target_os = "linux")))]
compile_error!("the `preload` feature needs a heap lock that never allocates, which only Linux provides");
mod global;
pub mod growth;
mod heap;
mod reshape;
pub mod trace;

pub use config::{CHUNK_SIZE, HeapConfig};
pub use error::{HeapError, Result};
pub use global::{Brkalloc, calloc, free, malloc, realloc, stats};
pub use growth::{Break, FixedBreak, Sbrk};
pub use heap::{BlockInfo, Heap, HeapStats};
