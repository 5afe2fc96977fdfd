fn main() {
    // Only run gRPC codegen when the "grpc" feature is enabled.
    // Cargo sets CARGO_FEATURE_GRPC when compiling with --features grpc.
    if std::env::var("CARGO_FEATURE_GRPC").is_ok() {
        let events = tonic_build::manual::Service::builder()
            .name("DirectoryEvents")
            .package("directory.events")
            .method(
                tonic_build::manual::Method::builder()
                    .name("listen")
                    .route_name("Listen")
                    .input_type("crate::transport::grpc::ListenRequest")
                    .output_type("crate::transport::grpc::EventMessage")
                    .codec_path("tonic::codec::ProstCodec")
                    .server_streaming()
                    .build(),
            )
            .build();

        let import = tonic_build::manual::Service::builder()
            .name("DirectoryImport")
            .package("directory.import")
            .method(
                tonic_build::manual::Method::builder()
                    .name("run_import")
                    .route_name("RunImport")
                    .input_type("crate::transport::grpc::RunImportRequest")
                    .output_type("crate::transport::grpc::RunImportResponse")
                    .codec_path("tonic::codec::ProstCodec")
                    .build(),
            )
            .build();

        tonic_build::manual::Builder::new().compile(&[events, import]);
    }
}
