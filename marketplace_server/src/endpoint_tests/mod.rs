mod helpers;
mod listings;
mod pipeline;
