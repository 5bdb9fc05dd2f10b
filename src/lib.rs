//! zcore - a Z-machine execution engine
//!
//! Loads story files of versions 1 through 8, executes them instruction by
//! instruction, and talks to the outside world only through the `Screen` and
//! `SaveStore` traits. Line and key input is handed in by the host whenever
//! `Interpreter::run` reports a pending read.

#[macro_use]
extern crate lazy_static;

pub mod config;
pub mod interpreter;

/*
Memory map of the synthetic stories built by the test utilities
Dynamic	00000	header
        00040	abbreviation table
        00100	global variables
        00300	objects, then property tables
        00c00	scratch tables and buffers
Static	01000	dictionary
High	02000	Z-code
        04000	end of file
*/
