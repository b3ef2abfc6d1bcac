/// Tools Module
///
/// Each tool lives in its own module and exports a `register` function that
/// adds it to a connection's registry, capturing that connection's configuration.

pub mod upload_file;
