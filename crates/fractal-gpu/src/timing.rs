//! GPU pass timing through timestamp queries.
//!
//! Each timer owns a two-entry query set written at the start and end of one
//! pass. After the pass the queries are resolved and copied into one of a
//! small ring of readback buffers, mapped after submit and read back on a
//! later frame without ever blocking. Adapters without `TIMESTAMP_QUERY`
//! get `PassTimer::Disabled`, which reports 0.

use std::sync::mpsc;

use wgpu::{Buffer, CommandEncoder, Device, QuerySet, Queue};

const QUERY_COUNT: u32 = 2;
const QUERY_BYTES: u64 = QUERY_COUNT as u64 * std::mem::size_of::<u64>() as u64;
const READBACK_SLOTS: usize = 3;

type MapResult = Result<(), wgpu::BufferAsyncError>;

enum SlotState {
    Idle,
    Submitted,
    Mapping(mpsc::Receiver<MapResult>),
}

struct ReadbackSlot {
    buffer: Buffer,
    state: SlotState,
}

/// Timestamp-query state for one pass.
pub struct TimestampTimer {
    query_set: QuerySet,
    resolve_buffer: Buffer,
    slots: Vec<ReadbackSlot>,
    period_ns: f64,
    latest_ms: f64,
}

pub enum PassTimer {
    Timestamp(TimestampTimer),
    /// Passes are created without timestamp writes; results stay 0.
    Disabled,
}

impl PassTimer {
    pub fn new(device: &Device, queue: &Queue, label: &str) -> Self {
        if device.features().contains(wgpu::Features::TIMESTAMP_QUERY) {
            PassTimer::Timestamp(TimestampTimer::new(device, queue, label))
        } else {
            log::warn!("{label}: timestamp queries unsupported, pass timing disabled");
            PassTimer::Disabled
        }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, PassTimer::Timestamp(_))
    }

    pub fn begin_compute_pass<'e>(&self, encoder: &'e mut CommandEncoder, label: &str) -> wgpu::ComputePass<'e> {
        let timestamp_writes = match self {
            PassTimer::Timestamp(t) => Some(wgpu::ComputePassTimestampWrites {
                query_set: &t.query_set,
                beginning_of_pass_write_index: Some(0),
                end_of_pass_write_index: Some(1),
            }),
            PassTimer::Disabled => None,
        };
        encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some(label),
            timestamp_writes,
        })
    }

    /// `desc` with this timer's timestamp writes filled in.
    pub fn begin_render_pass<'e>(
        &self,
        encoder: &'e mut CommandEncoder,
        desc: wgpu::RenderPassDescriptor<'_>,
    ) -> wgpu::RenderPass<'e> {
        let timestamp_writes = match self {
            PassTimer::Timestamp(t) => Some(wgpu::RenderPassTimestampWrites {
                query_set: &t.query_set,
                beginning_of_pass_write_index: Some(0),
                end_of_pass_write_index: Some(1),
            }),
            PassTimer::Disabled => None,
        };
        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            timestamp_writes,
            ..desc
        })
    }

    /// Record the resolve + copy for the pass just encoded. Skipped when every
    /// readback buffer is still in flight.
    pub fn resolve(&mut self, encoder: &mut CommandEncoder) {
        let PassTimer::Timestamp(t) = self else {
            return;
        };
        let Some(slot) = t.slots.iter_mut().find(|s| matches!(s.state, SlotState::Idle)) else {
            return;
        };
        encoder.resolve_query_set(&t.query_set, 0..QUERY_COUNT, &t.resolve_buffer, 0);
        encoder.copy_buffer_to_buffer(&t.resolve_buffer, 0, &slot.buffer, 0, QUERY_BYTES);
        slot.state = SlotState::Submitted;
    }

    /// Start mapping every buffer whose copy was just submitted.
    pub fn after_submit(&mut self) {
        let PassTimer::Timestamp(t) = self else {
            return;
        };
        for slot in &mut t.slots {
            if matches!(slot.state, SlotState::Submitted) {
                let (sender, receiver) = mpsc::channel();
                slot.buffer.slice(..).map_async(wgpu::MapMode::Read, move |result| {
                    let _ = sender.send(result);
                });
                slot.state = SlotState::Mapping(receiver);
            }
        }
    }

    /// Collect finished readbacks and return their buffers to the pool.
    /// The device must have been polled.
    pub fn poll(&mut self) {
        let PassTimer::Timestamp(t) = self else {
            return;
        };
        for slot in &mut t.slots {
            slot.state = match std::mem::replace(&mut slot.state, SlotState::Idle) {
                SlotState::Mapping(receiver) => match receiver.try_recv() {
                    Ok(Ok(())) => {
                        {
                            let mapped = slot.buffer.slice(..).get_mapped_range();
                            let ticks: &[u64] = bytemuck::cast_slice(&mapped);
                            if let [start, end, ..] = *ticks {
                                t.latest_ms = ticks_to_ms(start, end, t.period_ns);
                            }
                        }
                        slot.buffer.unmap();
                        SlotState::Idle
                    }
                    Ok(Err(e)) => {
                        log::warn!("timestamp readback failed: {e}");
                        SlotState::Idle
                    }
                    Err(mpsc::TryRecvError::Empty) => SlotState::Mapping(receiver),
                    Err(mpsc::TryRecvError::Disconnected) => SlotState::Idle,
                },
                other => other,
            };
        }
    }

    /// Milliseconds of the last pass read back; 0 until the first one.
    pub fn result_ms(&self) -> f64 {
        match self {
            PassTimer::Timestamp(t) => t.latest_ms,
            PassTimer::Disabled => 0.0,
        }
    }
}

impl TimestampTimer {
    fn new(device: &Device, queue: &Queue, label: &str) -> Self {
        let query_set = device.create_query_set(&wgpu::QuerySetDescriptor {
            label: Some(label),
            ty: wgpu::QueryType::Timestamp,
            count: QUERY_COUNT,
        });
        let resolve_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: QUERY_BYTES,
            usage: wgpu::BufferUsages::QUERY_RESOLVE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        let slots = (0..READBACK_SLOTS)
            .map(|_| ReadbackSlot {
                buffer: device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some(label),
                    size: QUERY_BYTES,
                    usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                }),
                state: SlotState::Idle,
            })
            .collect();
        Self {
            query_set,
            resolve_buffer,
            slots,
            period_ns: queue.get_timestamp_period() as f64,
            latest_ms: 0.0,
        }
    }
}

/// Tick delta to milliseconds. Clock wrap or reordering reads as 0.
pub fn ticks_to_ms(start: u64, end: u64, period_ns: f64) -> f64 {
    end.saturating_sub(start) as f64 * period_ns / 1_000_000.0
}
