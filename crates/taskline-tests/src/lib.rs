//! Integration and E2E tests for Taskline; see `tests/`.
