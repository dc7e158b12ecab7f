mod analyzer;
mod server;

#[cfg(test)]
mod server_test;

/// Analysis passes recurse once per tree level, up to `MAX_NESTING` deep.
const THREAD_STACK_SIZE: usize = 16 << 20;

fn main() -> anyhow::Result<()> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_stack_size(THREAD_STACK_SIZE)
        .build()?
        .block_on(server::run());
    Ok(())
}
