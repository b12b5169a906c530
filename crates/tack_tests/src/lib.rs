//! Integration suites for the tack workspace live in `tests/`.
