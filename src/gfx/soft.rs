use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};

use super::AdapterInfo;
use super::BufferInfo;
use super::BufferUsage;
use super::ClearColour;
use super::DeviceInfo;
use super::ScissorRect;
use super::SwapChainInfo;
use super::Topology;
use super::Viewport;

use super::CmdQueue as _;
use super::SwapChain as _;

use crate::os;
use crate::os::Window;
use crate::Error;

/// Software device. There is no real GPU behind it, submitted work retires on
/// a `Timeline` which orders completion the way a hardware queue does (FIFO,
/// completed value covers a prefix of submission order). Tests hold the
/// timeline to create genuine in-flight windows and retire work one
/// submission at a time.
pub struct Device {
    adapter_info: AdapterInfo,
}

/// Shared handle onto a queue's simulated GPU timeline.
#[derive(Clone)]
pub struct Timeline {
    shared: Arc<TimelineShared>,
}

struct TimelineShared {
    state: Mutex<TimelineState>,
    retired: Condvar,
}

struct TimelineState {
    completed: u64,
    pending: VecDeque<u64>,
    held: bool,
}

impl Timeline {
    fn create() -> Self {
        Timeline {
            shared: Arc::new(TimelineShared {
                state: Mutex::new(TimelineState {
                    completed: 0,
                    pending: VecDeque::new(),
                    held: false,
                }),
                retired: Condvar::new(),
            }),
        }
    }

    /// Stop retiring work, later submissions stay pending until `retire_one`
    /// or `release`
    pub fn hold(&self) {
        self.shared.state.lock().unwrap().held = true;
    }

    /// Retire all pending work and resume retiring new submissions immediately
    pub fn release(&self) {
        let mut state = self.shared.state.lock().unwrap();
        if let Some(last) = state.pending.back() {
            state.completed = *last;
        }
        state.pending.clear();
        state.held = false;
        self.shared.retired.notify_all();
    }

    /// Retire the oldest pending submission, returns its target
    pub fn retire_one(&self) -> Option<u64> {
        let mut state = self.shared.state.lock().unwrap();
        let target = state.pending.pop_front()?;
        state.completed = target;
        self.shared.retired.notify_all();
        Some(target)
    }

    pub fn get_completed(&self) -> u64 {
        self.shared.state.lock().unwrap().completed
    }

    pub fn get_pending_count(&self) -> usize {
        self.shared.state.lock().unwrap().pending.len()
    }

    fn submit(&self, target: u64) {
        let mut state = self.shared.state.lock().unwrap();
        if state.held {
            state.pending.push_back(target);
        } else {
            debug_assert!(state.pending.is_empty());
            state.completed = target;
            self.shared.retired.notify_all();
        }
    }

    fn wait_for(&self, target: u64) {
        let mut state = self.shared.state.lock().unwrap();
        while state.completed < target {
            state = self.shared.retired.wait(state).unwrap();
        }
    }
}

/// A command allocator stand-in, identified so tests can observe reuse.
pub struct Allocator {
    id: usize,
    resets: u32,
}

pub struct CmdQueue {
    timeline: Timeline,
    fence_value: u64,
    in_flight: VecDeque<(u64, Allocator)>,
    free_lists: Vec<usize>,
    next_allocator_id: usize,
    next_list_id: usize,
}

pub struct CmdBuf {
    list_id: usize,
    allocator: Allocator,
    commands: Vec<Command>,
}

enum Command {
    BeginRender,
    Clear,
    EndRender,
    SetViewport,
    SetScissorRect,
    SetTopology(Topology),
    SetVertexBuffer,
    SetIndexBuffer,
    Draw { vertices: u32, instances: u32 },
    DrawIndexed { indices: u32, instances: u32 },
}

pub struct SwapChain {
    num_buffers: u32,
    backbuffer_index: u32,
    frame_fence_value: Vec<u64>,
    last_presented: u64,
    width: i32,
    height: i32,
    clear_colour: Option<ClearColour>,
}

pub struct Buffer {
    usage: BufferUsage,
    stride: usize,
    size_bytes: usize,
}

impl super::Device for Device {
    type CmdQueue = CmdQueue;
    type CmdBuf = CmdBuf;
    type SwapChain = SwapChain;
    type Buffer = Buffer;

    fn create(info: &DeviceInfo) -> Device {
        let name = info
            .adapter_name
            .clone()
            .unwrap_or_else(|| String::from("flightline software adapter"));
        log::info!("flightline::gfx::soft: created device on {}", name);
        Device {
            adapter_info: AdapterInfo {
                name,
                dedicated_video_memory: 0,
            },
        }
    }

    fn create_cmd_queue(&self) -> Result<CmdQueue, Error> {
        Ok(CmdQueue {
            timeline: Timeline::create(),
            fence_value: 0,
            in_flight: VecDeque::new(),
            free_lists: Vec::new(),
            next_allocator_id: 0,
            next_list_id: 0,
        })
    }

    fn create_swap_chain<A: os::App>(
        &mut self,
        info: &SwapChainInfo,
        _queue: &CmdQueue,
        window: &A::Window,
    ) -> Result<SwapChain, Error> {
        if info.num_buffers < 2 {
            return Err(Error {
                msg: String::from(
                    "flightline::gfx::soft: a swap chain requires at least 2 buffers",
                ),
            });
        }
        let (width, height) = window.get_size();
        Ok(SwapChain {
            num_buffers: info.num_buffers,
            backbuffer_index: 0,
            frame_fence_value: vec![0; info.num_buffers as usize],
            last_presented: 0,
            width: std::cmp::max(width, 1),
            height: std::cmp::max(height, 1),
            clear_colour: info.clear_colour,
        })
    }

    fn create_buffer<T: Sized>(&mut self, info: &BufferInfo, data: &[T]) -> Result<Buffer, Error> {
        if let BufferUsage::Index = info.usage {
            if info.stride != 2 && info.stride != 4 {
                return Err(Error {
                    msg: format!(
                        "flightline::gfx::soft: unsupported index stride {}",
                        info.stride
                    ),
                });
            }
        }
        Ok(Buffer {
            usage: info.usage,
            stride: info.stride,
            size_bytes: std::mem::size_of_val(data),
        })
    }

    fn get_adapter_info(&self) -> &AdapterInfo {
        &self.adapter_info
    }
}

impl CmdQueue {
    /// Shared handle onto this queue's timeline, the test hook for holding
    /// and retiring simulated GPU work from another thread
    pub fn get_timeline(&self) -> Timeline {
        self.timeline.clone()
    }
}

impl super::CmdQueue<Device> for CmdQueue {
    fn acquire(&mut self, _device: &Device) -> CmdBuf {
        // reclaim the oldest allocator only once its tagged target completed
        let completed = self.timeline.get_completed();
        let reclaim = self
            .in_flight
            .front()
            .map_or(false, |(target, _)| *target <= completed);

        let allocator = if reclaim {
            let (_, mut allocator) = self.in_flight.pop_front().unwrap();
            allocator.resets += 1;
            allocator
        } else {
            let id = self.next_allocator_id;
            self.next_allocator_id += 1;
            Allocator { id, resets: 0 }
        };

        let list_id = if let Some(id) = self.free_lists.pop() {
            id
        } else {
            let id = self.next_list_id;
            self.next_list_id += 1;
            id
        };

        CmdBuf {
            list_id,
            allocator,
            commands: Vec::new(),
        }
    }

    fn submit(&mut self, cmd: CmdBuf) -> u64 {
        // close + execute are immediate on a software queue, the timeline
        // decides when the work retires
        let target = self.signal();
        self.in_flight.push_back((target, cmd.allocator));
        self.free_lists.push(cmd.list_id);
        target
    }

    fn signal(&mut self) -> u64 {
        self.fence_value += 1;
        self.timeline.submit(self.fence_value);
        self.fence_value
    }

    fn is_complete(&self, target: u64) -> bool {
        self.timeline.get_completed() >= target
    }

    fn wait(&self, target: u64) {
        self.timeline.wait_for(target);
    }

    fn flush(&mut self) {
        let target = self.signal();
        self.wait(target);
    }

    fn get_last_signalled(&self) -> u64 {
        self.fence_value
    }

    fn get_in_flight_count(&self) -> usize {
        let completed = self.timeline.get_completed();
        self.in_flight
            .iter()
            .filter(|(target, _)| *target > completed)
            .count()
    }
}

impl CmdBuf {
    pub fn get_allocator_id(&self) -> usize {
        self.allocator.id
    }

    pub fn get_allocator_reset_count(&self) -> u32 {
        self.allocator.resets
    }

    pub fn get_command_count(&self) -> usize {
        self.commands.len()
    }

    pub fn get_draw_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|command| {
                matches!(
                    command,
                    Command::Draw { .. } | Command::DrawIndexed { .. }
                )
            })
            .count()
    }

    /// Total vertices the recorded draws would process
    pub fn get_drawn_vertex_count(&self) -> u64 {
        self.commands
            .iter()
            .map(|command| match command {
                Command::Draw {
                    vertices,
                    instances,
                } => *vertices as u64 * *instances as u64,
                Command::DrawIndexed {
                    indices,
                    instances,
                } => *indices as u64 * *instances as u64,
                _ => 0,
            })
            .sum()
    }

    /// The most recently recorded topology, if any
    pub fn get_bound_topology(&self) -> Option<Topology> {
        self.commands.iter().rev().find_map(|command| match command {
            Command::SetTopology(topology) => Some(*topology),
            _ => None,
        })
    }
}

impl super::CmdBuf<Device> for CmdBuf {
    fn begin_render(&mut self, swap_chain: &SwapChain) {
        self.commands.push(Command::BeginRender);
        if swap_chain.clear_colour.is_some() {
            self.commands.push(Command::Clear);
        }
    }

    fn end_render(&mut self, _swap_chain: &SwapChain) {
        self.commands.push(Command::EndRender);
    }

    fn set_viewport(&mut self, _viewport: &Viewport) {
        self.commands.push(Command::SetViewport);
    }

    fn set_scissor_rect(&mut self, _scissor_rect: &ScissorRect) {
        self.commands.push(Command::SetScissorRect);
    }

    fn set_topology(&mut self, topology: Topology) {
        self.commands.push(Command::SetTopology(topology));
    }

    fn set_vertex_buffer(&mut self, _buffer: &Buffer, _slot: u32) {
        self.commands.push(Command::SetVertexBuffer);
    }

    fn set_index_buffer(&mut self, _buffer: &Buffer) {
        self.commands.push(Command::SetIndexBuffer);
    }

    fn draw_instanced(
        &mut self,
        vertex_count: u32,
        instance_count: u32,
        _start_vertex: u32,
        _start_instance: u32,
    ) {
        self.commands.push(Command::Draw {
            vertices: vertex_count,
            instances: instance_count,
        });
    }

    fn draw_indexed_instanced(
        &mut self,
        index_count: u32,
        instance_count: u32,
        _start_index: u32,
        _base_vertex: i32,
        _start_instance: u32,
    ) {
        self.commands.push(Command::DrawIndexed {
            indices: index_count,
            instances: instance_count,
        });
    }
}

impl super::SwapChain<Device> for SwapChain {
    fn new_frame(&mut self, queue: &CmdQueue) {
        let target = self.frame_fence_value[self.backbuffer_index as usize];
        queue.wait(target);
    }

    fn update<A: os::App>(&mut self, _device: &mut Device, queue: &mut CmdQueue, window: &A::Window) {
        let (width, height) = window.get_size();
        if width != self.width || height != self.height {
            // drain the queue before slot resources are invalidated
            queue.flush();
            self.width = std::cmp::max(width, 1);
            self.height = std::cmp::max(height, 1);
            for value in &mut self.frame_fence_value {
                *value = queue.get_last_signalled();
            }
            self.backbuffer_index = 0;
            log::info!(
                "flightline::gfx::soft: resized swap chain to {}x{}",
                self.width,
                self.height
            );
        } else {
            self.new_frame(queue);
        }
    }

    fn get_num_buffers(&self) -> u32 {
        self.num_buffers
    }

    fn get_backbuffer_index(&self) -> u32 {
        self.backbuffer_index
    }

    fn get_backbuffer_size(&self) -> (i32, i32) {
        (self.width, self.height)
    }

    fn get_frame_fence_value(&self) -> u64 {
        self.last_presented
    }

    fn set_clear_colour(&mut self, clear_colour: Option<ClearColour>) {
        self.clear_colour = clear_colour;
    }

    fn swap(&mut self, queue: &mut CmdQueue) {
        // present is a no-op with no display attached, the slot still cycles
        // and is tagged so the frame loop paces exactly like a native backend
        let target = queue.signal();
        self.frame_fence_value[self.backbuffer_index as usize] = target;
        self.last_presented = target;
        self.backbuffer_index = (self.backbuffer_index + 1) % self.num_buffers;
    }

    fn wait_for_last_frame(&self, queue: &CmdQueue) {
        let target = self.frame_fence_value.iter().copied().max().unwrap_or(0);
        queue.wait(target);
    }
}

impl Buffer {
    pub fn get_usage(&self) -> BufferUsage {
        self.usage
    }

    pub fn get_stride(&self) -> usize {
        self.stride
    }

    pub fn get_size_bytes(&self) -> usize {
        self.size_bytes
    }
}

impl super::Buffer<Device> for Buffer {}

#[cfg(test)]
mod tests {
    use super::Timeline;

    #[test]
    fn timeline_retires_in_submission_order() {
        let timeline = Timeline::create();
        timeline.hold();
        timeline.submit(1);
        timeline.submit(2);
        timeline.submit(3);
        assert_eq!(timeline.get_completed(), 0);
        assert_eq!(timeline.retire_one(), Some(1));
        assert_eq!(timeline.retire_one(), Some(2));
        assert_eq!(timeline.get_completed(), 2);
        assert_eq!(timeline.get_pending_count(), 1);
        timeline.release();
        assert_eq!(timeline.get_completed(), 3);
        assert_eq!(timeline.retire_one(), None);
    }

    #[test]
    fn timeline_completes_immediately_when_not_held() {
        let timeline = Timeline::create();
        timeline.submit(1);
        assert_eq!(timeline.get_completed(), 1);
        timeline.submit(2);
        assert_eq!(timeline.get_completed(), 2);
        assert_eq!(timeline.get_pending_count(), 0);
    }

    #[test]
    fn timeline_wait_returns_for_completed_targets() {
        let timeline = Timeline::create();
        timeline.submit(5);
        timeline.wait_for(5);
        timeline.wait_for(0);
    }
}
