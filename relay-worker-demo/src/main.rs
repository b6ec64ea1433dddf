//! Wires a thread-backed `WorkerContext` and a TCP-backed `Transport` to
//! `relay_core`, exercising all three invocation modes end to end (spec
//! SPEC_FULL §1 "Crate split").

use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use relay_core::async_delegate::{AsyncDelegate, BlockingAsyncDelegate};
use relay_core::config::{AsyncDelegateConfig, MonitorConfig, RetryConfig};
use relay_core::delegate::Delegate;
use relay_core::monitor::{SendStatus, SendStatusKind, TransportMonitor};
use relay_core::remote::{RemoteDelegate, Transport as TransportTrait, TransportDispatcher, ACK_ID};
use relay_core::retry::RetryTransport;
use relay_core::worker::WorkerContext;

use relay_worker_demo::config::DemoConfig;
use relay_worker_demo::signature::SetPosition;
use relay_worker_demo::transport::TcpTransport;
use relay_worker_demo::worker;

fn square(x: i32) -> i32 {
    x * x
}

fn sum(args: (i32, i32)) -> i32 {
    args.0 + args.1
}

fn demo_sync() {
    let delegate: Delegate<i32, i32> = Delegate::free(square);
    log::info!("sync: square(6) = {}", delegate.invoke(6));
}

fn demo_async(worker: Arc<dyn WorkerContext>) {
    let observed = Arc::new(Mutex::new(None));
    let observed_clone = Arc::clone(&observed);
    let target: Delegate<i32, ()> = Delegate::opaque(move |x: i32| {
        *observed_clone.lock().unwrap() = Some(x * x);
    });

    let async_delegate = AsyncDelegate::new(target, worker);
    async_delegate.invoke(7);

    thread::sleep(Duration::from_millis(50));
    log::info!("async: worker computed {:?}", *observed.lock().unwrap());
}

fn demo_blocking_async(worker: Arc<dyn WorkerContext>) {
    let blocking = BlockingAsyncDelegate::from_config(Delegate::free(sum), worker, &AsyncDelegateConfig::default());
    match blocking.invoke((4, 5)).result() {
        Some(result) => log::info!("blocking async: sum(4, 5) = {}", result),
        None => log::warn!("blocking async: timed out"),
    }
}

/// Runs the receiving side of the remote-invocation pipeline on an accepted
/// connection: read a frame, call through to the local target, send an ack
/// frame back carrying the same sequence (spec §4.6).
fn run_receiver(stream: TcpStream) {
    let transport = Arc::new(TcpTransport::new(stream).expect("receiver transport"));
    let receiving_target: Delegate<SetPosition, ()> = Delegate::opaque(|pos: SetPosition| {
        log::info!("remote: receiver observed SetPosition {{ x: {}, y: {} }}", pos.x, pos.y);
    });
    let remote: RemoteDelegate<SetPosition, ()> =
        RemoteDelegate::new(42, receiving_target).with_serializer(SetPosition::serializer());

    loop {
        let (header, payload) = match transport.receive() {
            Ok(frame) => frame,
            Err(_) => return,
        };
        if header.id == ACK_ID {
            continue;
        }
        remote.invoke_local(&payload[..]);

        let ack = relay_core::header::Header::new(ACK_ID, header.seq, 0);
        transport.send(&[], &ack);
    }
}

fn demo_remote(config: &DemoConfig) {
    let listener = TcpListener::bind(&config.listen_addr).expect("bind demo listener");
    let addr = listener.local_addr().expect("listener address");

    let receiver_ready = Arc::new(AtomicBool::new(false));
    let receiver_ready_clone = Arc::clone(&receiver_ready);
    thread::spawn(move || {
        receiver_ready_clone.store(true, Ordering::SeqCst);
        if let Ok((stream, _)) = listener.accept() {
            run_receiver(stream);
        }
    });
    while !receiver_ready.load(Ordering::SeqCst) {
        thread::yield_now();
    }

    let client_stream = TcpStream::connect(addr).expect("connect to demo listener");
    let transport = Arc::new(TcpTransport::new(client_stream).expect("sender transport"));

    let monitor = Arc::new(TransportMonitor::from_config(&MonitorConfig { timeout: config.monitor_timeout() }));
    let acked = Arc::new(AtomicBool::new(false));
    let acked_clone = Arc::clone(&acked);
    let _subscription = monitor.status_signal().connect(Delegate::opaque(move |status: SendStatus| {
        match status.status {
            SendStatusKind::Success => {
                acked_clone.store(true, Ordering::SeqCst);
                log::info!("remote: sender observed ack for seq {}", status.seq);
            }
            SendStatusKind::Timeout => log::warn!("remote: send timed out for seq {}", status.seq),
        }
    }));

    let retry_transport =
        RetryTransport::from_config(Arc::clone(&transport), Arc::clone(&monitor), &RetryConfig { max_retries: config.max_retries });
    let dispatcher = Arc::new(TransportDispatcher::new(retry_transport));

    // Drain incoming ack frames on a background thread: the monitor only
    // resolves once `remove` is called with the acknowledged sequence.
    let ack_transport = Arc::clone(&transport);
    let ack_monitor = Arc::clone(&monitor);
    let acked_for_loop = Arc::clone(&acked);
    thread::spawn(move || {
        while !acked_for_loop.load(Ordering::SeqCst) {
            match ack_transport.receive() {
                Ok((header, _)) if header.id == ACK_ID => ack_monitor.remove(header.seq),
                Ok(_) => {}
                Err(_) => return,
            }
        }
    });

    let sending_delegate: RemoteDelegate<SetPosition, ()> = RemoteDelegate::new(42, Delegate::empty())
        .with_serializer(SetPosition::serializer())
        .with_dispatcher(dispatcher);

    sending_delegate.invoke(SetPosition { x: 1.5, y: -2.25 });

    for _ in 0..50 {
        if acked.load(Ordering::SeqCst) {
            break;
        }
        thread::sleep(Duration::from_millis(20));
    }
    if !acked.load(Ordering::SeqCst) {
        log::warn!("remote: demo send was not acked within the wait window");
    }
}

fn main() {
    env_logger::init();

    let config = DemoConfig::load("relay-worker-demo.json");
    log::info!("starting with config: {:?}", config);

    demo_sync();

    let thread_worker = worker::ThreadWorker::spawn(config.worker_count);
    let worker_context: Arc<dyn WorkerContext> = thread_worker.clone();
    demo_async(Arc::clone(&worker_context));
    demo_blocking_async(worker_context);
    thread_worker.shutdown();

    demo_remote(&config);
}
