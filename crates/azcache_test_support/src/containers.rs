use testcontainers::GenericImage;
use testcontainers::clients::Cli;
use testcontainers::core::WaitFor;

/// Run `run` against a throwaway Redis 7 container.
///
/// The closure receives the host and the mapped port. The container is
/// removed when the closure returns.
pub fn with_redis<T, E, F>(run: F) -> Result<T, E>
where
    F: FnOnce(String, u16) -> Result<T, E>,
{
    let docker = Cli::default();
    let image = GenericImage::new("redis", "7")
        .with_exposed_port(6379)
        .with_wait_for(WaitFor::message_on_stdout("Ready to accept connections"));

    let container = docker.run(image);
    let port = container.get_host_port_ipv4(6379);

    run("127.0.0.1".to_string(), port)
}
