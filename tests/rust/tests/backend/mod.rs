//! Backend client tests against a mock HTTP server
