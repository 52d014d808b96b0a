/// Direct3D12 backend.
#[cfg(target_os = "windows")]
pub mod d3d12;

/// Software timeline backend, used by tests and platforms with no native backend.
pub mod soft;

use std::any::Any;

use crate::os;
use crate::Error;

/// Information to create a device, it will be constructed on the primary adapter
/// unless `adapter_name` matches part of another adapter's description.
pub struct DeviceInfo {
    pub adapter_name: Option<String>,
}

impl Default for DeviceInfo {
    fn default() -> Self {
        DeviceInfo { adapter_name: None }
    }
}

/// Description of the adapter a device was created on.
#[derive(Clone, Debug)]
pub struct AdapterInfo {
    pub name: String,
    pub dedicated_video_memory: usize,
}

/// Format of the swap chain backbuffers.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Format {
    RGBA8n,
    BGRA8n,
}

/// RGBA clear values in 0-1 range.
#[derive(Copy, Clone, Debug)]
pub struct ClearColour {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

/// Information to create a swap chain on a window.
pub struct SwapChainInfo {
    /// Number of backbuffers (2 for double buffered, 3 for triple etc).
    /// This also bounds the number of frames the CPU may record ahead of the GPU.
    pub num_buffers: u32,
    pub format: Format,
    /// Present with vertical sync (sync interval 1) when true
    pub vsync: bool,
    /// Clear colour applied by `CmdBuf::begin_render`, None to skip the clear
    pub clear_colour: Option<ClearColour>,
}

impl Default for SwapChainInfo {
    fn default() -> Self {
        SwapChainInfo {
            num_buffers: 2,
            format: Format::RGBA8n,
            vsync: true,
            clear_colour: Some(ClearColour {
                r: 0.45,
                g: 0.55,
                b: 0.60,
                a: 1.00,
            }),
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum BufferUsage {
    Vertex,
    Index,
}

/// Information to create a vertex or index buffer from initial data.
pub struct BufferInfo {
    pub usage: BufferUsage,
    /// Distance in bytes between elements, for index buffers 2 and 4 byte strides are supported
    pub stride: usize,
}

/// Primitive topology bound for draw calls.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Topology {
    PointList,
    LineList,
    TriangleList,
    TriangleStrip,
}

pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

pub struct ScissorRect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

/// A graphics device, this is the entry point of the gfx module and a factory
/// for queues, swap chains and buffers.
pub trait Device: 'static + Sized + Any + Send + Sync {
    type CmdQueue: CmdQueue<Self>;
    type CmdBuf: CmdBuf<Self>;
    type SwapChain: SwapChain<Self>;
    type Buffer: Buffer<Self>;

    /// Create a device on the chosen adapter, failure to create a device is fatal
    fn create(info: &DeviceInfo) -> Self;

    /// Create a command queue with its own fence timeline
    fn create_cmd_queue(&self) -> Result<Self::CmdQueue, Error>;

    /// Create a swap chain presenting to `window` through `queue`
    fn create_swap_chain<A: os::App>(
        &mut self,
        info: &SwapChainInfo,
        queue: &Self::CmdQueue,
        window: &A::Window,
    ) -> Result<Self::SwapChain, Error>;

    /// Create a vertex or index buffer initialised with `data`
    fn create_buffer<T: Sized>(
        &mut self,
        info: &BufferInfo,
        data: &[T],
    ) -> Result<Self::Buffer, Error>;

    /// Returns the info of the adapter the device was created on
    fn get_adapter_info(&self) -> &AdapterInfo;
}

/// A command queue owns the fence timeline used to order CPU submission against
/// GPU completion, and recycles command buffers and their backing allocators.
///
/// An allocator handed out by `acquire` is only reclaimed once the fence target
/// tagged by the `submit` that returned it is complete; resetting earlier would
/// let the CPU overwrite memory the GPU is still reading.
///
/// The queue is single writer, recording from multiple threads requires
/// external locking and is out of scope here. Per-frame operations treat driver
/// failure as fatal since a failed submission leaves GPU state undefined.
pub trait CmdQueue<D: Device>: 'static + Sized + Any {
    /// Hand out a ready-to-record command buffer bound to an allocator.
    /// The oldest in-flight allocator is reclaimed when its fence target is
    /// complete, otherwise a fresh one is created; pooled command buffers are
    /// reused whenever available.
    fn acquire(&mut self, device: &D) -> D::CmdBuf;

    /// Close `cmd`, execute it on the queue, signal the fence and tag the
    /// allocator for reclamation. Returns the fence target tagging this
    /// submission; the command buffer itself returns to the pool.
    fn submit(&mut self, cmd: D::CmdBuf) -> u64;

    /// Advance the fence counter and ask the GPU to write the new value once
    /// all previously submitted work completes. Returns the new target,
    /// successive targets strictly increase.
    fn signal(&mut self) -> u64;

    /// Non-blocking check of the fence's completed value against `target`
    fn is_complete(&self, target: u64) -> bool;

    /// Block the calling thread on an OS wait primitive until `target` is
    /// complete. Returns immediately if it already is, never busy-spins.
    fn wait(&self, target: u64);

    /// `wait(signal())`, guarantees the GPU has drained all outstanding work.
    /// Required before releasing resources the GPU might still reference and
    /// at shutdown.
    fn flush(&mut self);

    /// Returns the most recent target returned by `signal`
    fn get_last_signalled(&self) -> u64;

    /// Number of submissions whose fence target is not yet complete
    fn get_in_flight_count(&self) -> usize;
}

/// A recording command buffer bound to its allocator. Acquired from a
/// `CmdQueue` and consumed by `CmdQueue::submit`, so it cannot be recorded
/// into once the GPU owns it.
pub trait CmdBuf<D: Device>: 'static + Sized + Any {
    /// Transition the current backbuffer to render target and apply the swap
    /// chain clear colour if one was requested
    fn begin_render(&mut self, swap_chain: &D::SwapChain);

    /// Transition the current backbuffer back to the present state
    fn end_render(&mut self, swap_chain: &D::SwapChain);

    fn set_viewport(&mut self, viewport: &Viewport);
    fn set_scissor_rect(&mut self, scissor_rect: &ScissorRect);
    fn set_topology(&mut self, topology: Topology);
    fn set_vertex_buffer(&mut self, buffer: &D::Buffer, slot: u32);
    fn set_index_buffer(&mut self, buffer: &D::Buffer);

    fn draw_instanced(
        &mut self,
        vertex_count: u32,
        instance_count: u32,
        start_vertex: u32,
        start_instance: u32,
    );

    fn draw_indexed_instanced(
        &mut self,
        index_count: u32,
        instance_count: u32,
        start_index: u32,
        base_vertex: i32,
        start_instance: u32,
    );
}

/// Rotating presentation buffers. Each slot stores the fence target signalled
/// when it was last presented; recording into a slot is gated on that target
/// so the number of in-flight frames never exceeds the slot count.
pub trait SwapChain<D: Device>: 'static + Sized + Any {
    /// Wait until the current slot's previously recorded work is GPU-complete
    fn new_frame(&mut self, queue: &D::CmdQueue);

    /// Handle window size changes and start a new frame. A resize flushes the
    /// queue first, no slot resource is torn down while the GPU could still
    /// reference it.
    fn update<A: os::App>(&mut self, device: &mut D, queue: &mut D::CmdQueue, window: &A::Window);

    fn get_num_buffers(&self) -> u32;

    /// Index of the slot currently available for recording
    fn get_backbuffer_index(&self) -> u32;

    /// Size of the backbuffers in pixels
    fn get_backbuffer_size(&self) -> (i32, i32);

    /// The fence target signalled for the most recent present
    fn get_frame_fence_value(&self) -> u64;

    /// Change the clear colour applied by `CmdBuf::begin_render`
    fn set_clear_colour(&mut self, clear_colour: Option<ClearColour>);

    /// Present the current backbuffer, signal and tag the slot, then advance
    /// to the backend-chosen next slot
    fn swap(&mut self, queue: &mut D::CmdQueue);

    /// Wait for every slot's tagged work to complete, called before teardown
    /// or resize so no backbuffer is released while in use by the GPU
    fn wait_for_last_frame(&self, queue: &D::CmdQueue);
}

pub trait Buffer<D: Device>: 'static + Sized + Any {}

impl From<os::Rect<i32>> for Viewport {
    fn from(rect: os::Rect<i32>) -> Viewport {
        Viewport {
            x: rect.x as f32,
            y: rect.y as f32,
            width: rect.width as f32,
            height: rect.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }
}

impl From<os::Rect<i32>> for ScissorRect {
    fn from(rect: os::Rect<i32>) -> ScissorRect {
        ScissorRect {
            left: rect.x,
            top: rect.y,
            right: rect.width,
            bottom: rect.height,
        }
    }
}

pub fn as_u8_slice<T: Sized>(p: &T) -> &[u8] {
    unsafe { std::slice::from_raw_parts((p as *const T) as *const u8, std::mem::size_of::<T>()) }
}
