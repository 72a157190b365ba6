pub mod hamming;
pub mod residues;
