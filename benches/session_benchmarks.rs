use criterion::{black_box, criterion_group, criterion_main, Criterion};
use dasp_graph::Buffer;
use entrain::graph::Inputs;
use entrain::nodes::{BandPass, Sine};
use entrain::{AudioNode, Context, EngineConfig, ProcessContext, RtrbSink, Session};

const CTX: ProcessContext = ProcessContext { sample_rate: 48_000, buffer_size: 64, frame: 0 };

pub fn criterion_benchmark(c: &mut Criterion) {
    c.bench_function("Sine.process()", |b| {
        let mut source = Sine::new(440.0);
        let mut output = [Buffer::default()];

        b.iter(|| source.process(&CTX, &Inputs::none(), &mut output))
    });

    c.bench_function("BandPass.process()", |b| {
        let mut filter = BandPass::new(440.0, 2.0);
        let mut output = [Buffer::default()];

        b.iter(|| filter.process(&CTX, &Inputs::none(), &mut output))
    });

    c.bench_function("Session.process() five generators", |b| {
        let (producer, mut consumer) = rtrb::RingBuffer::new(4096);
        let mut session = Session::new(EngineConfig::default().with_seed(1)).unwrap();
        session
            .start_with(Context::new(48_000).with_output(RtrbSink::stereo(producer)))
            .unwrap();
        for slot in 0..5 {
            session.set_level(40.0, Some(slot)).unwrap();
            session.set_noise(50.0, Some(slot)).unwrap();
        }

        b.iter(|| {
            session.process().unwrap();
            while let Ok(sample) = consumer.pop() {
                black_box(sample);
            }
        })
    });

    c.bench_function("Session.set_carrier() multi-edit", |b| {
        let mut session = Session::new(EngineConfig::default().with_seed(2)).unwrap();
        session.start_with(Context::new(48_000)).unwrap();
        session.set_multi_edit(true).unwrap();
        let mut carrier = 100.0;

        b.iter(|| {
            carrier = if carrier > 1_000.0 { 100.0 } else { carrier + 1.0 };
            session.set_carrier(black_box(carrier), None).unwrap();
            // keep the control queues drained
            session.process().unwrap();
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
