// Graph Nodes

pub mod decide;
pub mod document;
pub mod response;
pub mod weather;

pub use decide::{
    extract_city, heuristic_decision, mentions_weather, parse_decision, DecideNode, ParsedDecision,
};
pub use document::DocumentNode;
pub use response::ResponseNode;
pub use weather::WeatherNode;
