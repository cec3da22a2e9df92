//! Binary-side test suite: end-to-end scenarios across the library modules.

mod engine_tests;
