//! This module parses the calendar feed text format into [`Event`](crate::Event)s
//!
//! The dialect is a simplified iCalendar (`BEGIN:VEVENT`...`END:VEVENT` records, folded lines, escaped text). \
//! The parser is hand-written rather than delegated to a third-party iCal library: real feeds of this kind are sloppy, and the contract here is "never fail, skip what cannot be understood" rather than RFC 5545 conformance.

mod parser;
pub use parser::parse;
