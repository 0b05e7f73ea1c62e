// Testdeck HTTP Infrastructure
// Implements the HttpTransport port using reqwest

mod transport;

pub use transport::ReqwestTransport;
