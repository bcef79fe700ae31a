pub mod entur;
