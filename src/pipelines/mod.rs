pub mod layout;
pub mod quantification;
pub mod reference;
pub mod rnaseq;
pub mod samples;
