mod fixtures;

pub use fixtures::request_fixtures;
pub use fixtures::template_definitions;
pub use fixtures::RequestFixture;
