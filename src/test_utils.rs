/// 1x1 transparent PNG as a data URI, shared with the integration tests.
pub const PIXEL: &str = include_str!("../tests/fixtures/pixel.datauri");
