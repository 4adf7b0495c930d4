mod all_of;
mod operations;
mod orchestrator;
mod support;
