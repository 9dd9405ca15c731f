pub mod corpus;
pub mod coverage;
pub mod export;
pub mod plot;
pub mod runner;
pub mod seeds;

#[cfg(test)]
pub(crate) mod testutil;
