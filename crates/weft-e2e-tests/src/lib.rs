//! End-to-end tests for the Weft pipeline. The suites live in `tests/` and
//! compile the shaders under `shaders/`.
