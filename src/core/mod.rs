pub mod codec;
pub mod commentary;
pub mod markov;
pub mod pipeline;
pub mod request;
pub mod rng;
pub mod stats;
