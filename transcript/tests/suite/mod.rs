// Aggregates the transcript integration tests as modules.
mod exploration;
mod items;
