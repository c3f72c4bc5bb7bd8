//! Queue operations, grouped by table

mod inbound;
mod nodes;
mod outbound;
