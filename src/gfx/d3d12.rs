use std::collections::VecDeque;

use windows::core::Interface;
use windows::Win32::Foundation::*;
use windows::Win32::Graphics::Direct3D::*;
use windows::Win32::Graphics::Direct3D12::*;
use windows::Win32::Graphics::Dxgi::Common::*;
use windows::Win32::Graphics::Dxgi::*;
use windows::Win32::System::Threading::*;

use super::AdapterInfo;
use super::BufferInfo;
use super::BufferUsage;
use super::ClearColour;
use super::DeviceInfo;
use super::Format;
use super::ScissorRect;
use super::SwapChainInfo;
use super::Topology;
use super::Viewport;

use super::CmdQueue as _;
use super::SwapChain as _;

use crate::os;
use crate::os::NativeHandle as _;
use crate::os::Window as _;
use crate::Error;

pub struct Device {
    adapter: IDXGIAdapter1,
    adapter_info: AdapterInfo,
    dxgi_factory: IDXGIFactory4,
    device: ID3D12Device,
}

// d3d12 device interfaces are free threaded
unsafe impl Send for Device {}
unsafe impl Sync for Device {}

/// Owned fence event handle, closed when the queue drops.
struct FenceEvent(HANDLE);

impl Drop for FenceEvent {
    fn drop(&mut self) {
        unsafe {
            let _ = CloseHandle(self.0);
        }
    }
}

pub struct CmdQueue {
    command_queue: ID3D12CommandQueue,
    fence: ID3D12Fence,
    fence_event: FenceEvent,
    fence_value: u64,
    in_flight: VecDeque<(u64, ID3D12CommandAllocator)>,
    free_lists: Vec<ID3D12GraphicsCommandList>,
}

pub struct CmdBuf {
    command_list: ID3D12GraphicsCommandList,
    allocator: ID3D12CommandAllocator,
}

pub struct SwapChain {
    swap_chain: IDXGISwapChain3,
    rtv_heap: ID3D12DescriptorHeap,
    rtv_handles: Vec<D3D12_CPU_DESCRIPTOR_HANDLE>,
    render_targets: Vec<ID3D12Resource>,
    frame_fence_value: Vec<u64>,
    last_presented: u64,
    backbuffer_index: u32,
    num_buffers: u32,
    width: i32,
    height: i32,
    vsync: bool,
    clear_colour: Option<ClearColour>,
}

pub struct Buffer {
    _resource: ID3D12Resource,
    vbv: Option<D3D12_VERTEX_BUFFER_VIEW>,
    ibv: Option<D3D12_INDEX_BUFFER_VIEW>,
}

fn to_dxgi_format(format: Format) -> DXGI_FORMAT {
    match format {
        Format::RGBA8n => DXGI_FORMAT_R8G8B8A8_UNORM,
        Format::BGRA8n => DXGI_FORMAT_B8G8R8A8_UNORM,
    }
}

fn to_d3d_topology(topology: Topology) -> D3D_PRIMITIVE_TOPOLOGY {
    match topology {
        Topology::PointList => D3D_PRIMITIVE_TOPOLOGY_POINTLIST,
        Topology::LineList => D3D_PRIMITIVE_TOPOLOGY_LINELIST,
        Topology::TriangleList => D3D_PRIMITIVE_TOPOLOGY_TRIANGLELIST,
        Topology::TriangleStrip => D3D_PRIMITIVE_TOPOLOGY_TRIANGLESTRIP,
    }
}

fn transition_barrier(
    resource: &ID3D12Resource,
    state_before: D3D12_RESOURCE_STATES,
    state_after: D3D12_RESOURCE_STATES,
) -> D3D12_RESOURCE_BARRIER {
    D3D12_RESOURCE_BARRIER {
        Type: D3D12_RESOURCE_BARRIER_TYPE_TRANSITION,
        Flags: D3D12_RESOURCE_BARRIER_FLAG_NONE,
        Anonymous: D3D12_RESOURCE_BARRIER_0 {
            Transition: std::mem::ManuallyDrop::new(D3D12_RESOURCE_TRANSITION_BARRIER {
                pResource: unsafe { std::mem::transmute_copy(resource) },
                StateBefore: state_before,
                StateAfter: state_after,
                Subresource: D3D12_RESOURCE_BARRIER_ALL_SUBRESOURCES,
            }),
        },
    }
}

fn adapter_description(desc: &DXGI_ADAPTER_DESC1) -> String {
    String::from_utf16_lossy(&desc.Description)
        .trim_end_matches('\0')
        .to_string()
}

fn get_hardware_adapter(
    factory: &IDXGIFactory4,
    adapter_name: &Option<String>,
) -> Result<(IDXGIAdapter1, AdapterInfo), Error> {
    unsafe {
        let mut i = 0;
        while let Ok(adapter) = factory.EnumAdapters1(i) {
            i += 1;
            let desc = adapter.GetDesc1()?;

            // skip the software rasteriser, it is not a presentation device
            if (DXGI_ADAPTER_FLAG(desc.Flags as i32) & DXGI_ADAPTER_FLAG_SOFTWARE)
                != DXGI_ADAPTER_FLAG_NONE
            {
                continue;
            }

            let name = adapter_description(&desc);
            if let Some(filter) = adapter_name {
                if !name.to_lowercase().contains(&filter.to_lowercase()) {
                    continue;
                }
            }

            // check the adapter supports d3d12 without creating the device
            if D3D12CreateDevice(
                &adapter,
                D3D_FEATURE_LEVEL_11_0,
                std::ptr::null_mut::<Option<ID3D12Device>>(),
            )
            .is_ok()
            {
                let adapter_info = AdapterInfo {
                    name,
                    dedicated_video_memory: desc.DedicatedVideoMemory,
                };
                return Ok((adapter, adapter_info));
            }
        }
    }
    Err(Error {
        msg: String::from("flightline::gfx::d3d12: no suitable hardware adapter found"),
    })
}

impl super::Device for Device {
    type CmdQueue = CmdQueue;
    type CmdBuf = CmdBuf;
    type SwapChain = SwapChain;
    type Buffer = Buffer;

    fn create(info: &DeviceInfo) -> Device {
        unsafe {
            let mut dxgi_factory_flags = DXGI_CREATE_FACTORY_FLAGS::default();
            if cfg!(debug_assertions) {
                let mut debug: Option<ID3D12Debug> = None;
                if let Some(debug) = D3D12GetDebugInterface(&mut debug).ok().and_then(|_| debug) {
                    debug.EnableDebugLayer();
                    log::info!("flightline::gfx::d3d12: enabled debug layer");
                }
                dxgi_factory_flags = DXGI_CREATE_FACTORY_DEBUG;
            }

            let dxgi_factory: IDXGIFactory4 = CreateDXGIFactory2(dxgi_factory_flags)
                .expect("flightline::gfx::d3d12: failed to create dxgi factory");

            let (adapter, adapter_info) = get_hardware_adapter(&dxgi_factory, &info.adapter_name)
                .expect("flightline::gfx::d3d12: failed to get hardware adapter");

            let mut d3d12_device: Option<ID3D12Device> = None;
            D3D12CreateDevice(&adapter, D3D_FEATURE_LEVEL_11_0, &mut d3d12_device)
                .expect("flightline::gfx::d3d12: failed to create d3d12 device");
            let device = d3d12_device.unwrap();

            log::info!(
                "flightline::gfx::d3d12: created device on {}",
                adapter_info.name
            );

            Device {
                adapter,
                adapter_info,
                dxgi_factory,
                device,
            }
        }
    }

    fn create_cmd_queue(&self) -> Result<CmdQueue, Error> {
        unsafe {
            let desc = D3D12_COMMAND_QUEUE_DESC {
                Type: D3D12_COMMAND_LIST_TYPE_DIRECT,
                NodeMask: 1,
                ..Default::default()
            };
            let command_queue: ID3D12CommandQueue = self.device.CreateCommandQueue(&desc)?;
            let fence: ID3D12Fence = self.device.CreateFence(0, D3D12_FENCE_FLAG_NONE)?;
            let fence_event = CreateEventA(None, false, false, None)?;

            Ok(CmdQueue {
                command_queue,
                fence,
                fence_event: FenceEvent(fence_event),
                fence_value: 0,
                in_flight: VecDeque::new(),
                free_lists: Vec::new(),
            })
        }
    }

    fn create_swap_chain<A: os::App>(
        &mut self,
        info: &SwapChainInfo,
        queue: &CmdQueue,
        window: &A::Window,
    ) -> Result<SwapChain, Error> {
        unsafe {
            let (width, height) = window.get_size();
            let width = std::cmp::max(width, 1);
            let height = std::cmp::max(height, 1);

            let swap_chain_desc = DXGI_SWAP_CHAIN_DESC1 {
                BufferCount: info.num_buffers,
                Width: width as u32,
                Height: height as u32,
                Format: to_dxgi_format(info.format),
                BufferUsage: DXGI_USAGE_RENDER_TARGET_OUTPUT,
                SwapEffect: DXGI_SWAP_EFFECT_FLIP_DISCARD,
                SampleDesc: DXGI_SAMPLE_DESC {
                    Count: 1,
                    ..Default::default()
                },
                ..Default::default()
            };

            let hwnd = HWND(window.get_native_handle().get_isize() as *mut core::ffi::c_void);
            let swap_chain: IDXGISwapChain3 = self
                .dxgi_factory
                .CreateSwapChainForHwnd(&queue.command_queue, hwnd, &swap_chain_desc, None, None)?
                .cast()?;

            // fullscreen transitions are handled by resizing the window
            self.dxgi_factory
                .MakeWindowAssociation(hwnd, DXGI_MWA_NO_ALT_ENTER)?;

            let rtv_heap: ID3D12DescriptorHeap =
                self.device.CreateDescriptorHeap(&D3D12_DESCRIPTOR_HEAP_DESC {
                    NumDescriptors: info.num_buffers,
                    Type: D3D12_DESCRIPTOR_HEAP_TYPE_RTV,
                    ..Default::default()
                })?;

            let mut swap_chain = SwapChain {
                swap_chain,
                rtv_heap,
                rtv_handles: Vec::new(),
                render_targets: Vec::new(),
                frame_fence_value: vec![0; info.num_buffers as usize],
                last_presented: 0,
                backbuffer_index: 0,
                num_buffers: info.num_buffers,
                width,
                height,
                vsync: info.vsync,
                clear_colour: info.clear_colour,
            };
            swap_chain.create_backbuffer_views(self)?;
            swap_chain.backbuffer_index = swap_chain.swap_chain.GetCurrentBackBufferIndex();
            Ok(swap_chain)
        }
    }

    fn create_buffer<T: Sized>(&mut self, info: &BufferInfo, data: &[T]) -> Result<Buffer, Error> {
        let size_bytes = std::mem::size_of_val(data);

        let mut resource: Option<ID3D12Resource> = None;
        unsafe {
            self.device.CreateCommittedResource(
                &D3D12_HEAP_PROPERTIES {
                    Type: D3D12_HEAP_TYPE_UPLOAD,
                    ..Default::default()
                },
                D3D12_HEAP_FLAG_NONE,
                &D3D12_RESOURCE_DESC {
                    Dimension: D3D12_RESOURCE_DIMENSION_BUFFER,
                    Width: size_bytes as u64,
                    Height: 1,
                    DepthOrArraySize: 1,
                    MipLevels: 1,
                    SampleDesc: DXGI_SAMPLE_DESC {
                        Count: 1,
                        Quality: 0,
                    },
                    Layout: D3D12_TEXTURE_LAYOUT_ROW_MAJOR,
                    ..Default::default()
                },
                D3D12_RESOURCE_STATE_GENERIC_READ,
                None,
                &mut resource,
            )?;
        }
        let resource = resource.unwrap();

        // upload heap memory is CPU visible, copy the initial data straight in
        unsafe {
            let mut map_data = std::ptr::null_mut();
            resource.Map(0, None, Some(&mut map_data))?;
            std::ptr::copy_nonoverlapping(
                data.as_ptr() as *const u8,
                map_data as *mut u8,
                size_bytes,
            );
            resource.Unmap(0, None);
        }

        let mut vbv: Option<D3D12_VERTEX_BUFFER_VIEW> = None;
        let mut ibv: Option<D3D12_INDEX_BUFFER_VIEW> = None;

        match info.usage {
            BufferUsage::Vertex => {
                vbv = Some(D3D12_VERTEX_BUFFER_VIEW {
                    BufferLocation: unsafe { resource.GetGPUVirtualAddress() },
                    StrideInBytes: info.stride as u32,
                    SizeInBytes: size_bytes as u32,
                });
            }
            BufferUsage::Index => {
                let format = match info.stride {
                    2 => DXGI_FORMAT_R16_UINT,
                    4 => DXGI_FORMAT_R32_UINT,
                    _ => {
                        return Err(Error {
                            msg: format!(
                                "flightline::gfx::d3d12: unsupported index stride {}",
                                info.stride
                            ),
                        })
                    }
                };
                ibv = Some(D3D12_INDEX_BUFFER_VIEW {
                    BufferLocation: unsafe { resource.GetGPUVirtualAddress() },
                    SizeInBytes: size_bytes as u32,
                    Format: format,
                });
            }
        }

        Ok(Buffer {
            _resource: resource,
            vbv,
            ibv,
        })
    }

    fn get_adapter_info(&self) -> &AdapterInfo {
        &self.adapter_info
    }
}

impl super::CmdQueue<Device> for CmdQueue {
    fn acquire(&mut self, device: &Device) -> CmdBuf {
        // reclaim the oldest allocator only once its tagged target completed
        let completed = unsafe { self.fence.GetCompletedValue() };
        let reclaim = self
            .in_flight
            .front()
            .map_or(false, |(target, _)| *target <= completed);

        let allocator = if reclaim {
            let (_, allocator) = self.in_flight.pop_front().unwrap();
            unsafe {
                allocator
                    .Reset()
                    .expect("flightline::gfx::d3d12: failed to reset command allocator");
            }
            allocator
        } else {
            unsafe {
                device
                    .device
                    .CreateCommandAllocator(D3D12_COMMAND_LIST_TYPE_DIRECT)
                    .expect("flightline::gfx::d3d12: failed to create command allocator")
            }
        };

        let command_list = if let Some(list) = self.free_lists.pop() {
            unsafe {
                list.Reset(&allocator, None)
                    .expect("flightline::gfx::d3d12: failed to reset command list");
            }
            list
        } else {
            // lists are created open and ready to record
            unsafe {
                device
                    .device
                    .CreateCommandList(0, D3D12_COMMAND_LIST_TYPE_DIRECT, &allocator, None)
                    .expect("flightline::gfx::d3d12: failed to create command list")
            }
        };

        CmdBuf {
            command_list,
            allocator,
        }
    }

    fn submit(&mut self, cmd: CmdBuf) -> u64 {
        let CmdBuf {
            command_list,
            allocator,
        } = cmd;

        unsafe {
            command_list
                .Close()
                .expect("flightline::gfx::d3d12: failed to close command list");
            let lists = [Some(
                command_list
                    .cast::<ID3D12CommandList>()
                    .expect("flightline::gfx::d3d12: failed to cast command list"),
            )];
            self.command_queue.ExecuteCommandLists(&lists);
        }

        let target = self.signal();
        self.in_flight.push_back((target, allocator));
        self.free_lists.push(command_list);
        target
    }

    fn signal(&mut self) -> u64 {
        self.fence_value += 1;
        unsafe {
            self.command_queue
                .Signal(&self.fence, self.fence_value)
                .expect("flightline::gfx::d3d12: failed to signal fence");
        }
        self.fence_value
    }

    fn is_complete(&self, target: u64) -> bool {
        unsafe { self.fence.GetCompletedValue() >= target }
    }

    fn wait(&self, target: u64) {
        if !self.is_complete(target) {
            unsafe {
                self.fence
                    .SetEventOnCompletion(target, self.fence_event.0)
                    .expect("flightline::gfx::d3d12: failed to set fence completion event");
                WaitForSingleObject(self.fence_event.0, INFINITE);
            }
        }
    }

    fn flush(&mut self) {
        let target = self.signal();
        self.wait(target);
    }

    fn get_last_signalled(&self) -> u64 {
        self.fence_value
    }

    fn get_in_flight_count(&self) -> usize {
        let completed = unsafe { self.fence.GetCompletedValue() };
        self.in_flight
            .iter()
            .filter(|(target, _)| *target > completed)
            .count()
    }
}

impl super::CmdBuf<Device> for CmdBuf {
    fn begin_render(&mut self, swap_chain: &SwapChain) {
        let bb = swap_chain.backbuffer_index as usize;
        unsafe {
            let barrier = transition_barrier(
                &swap_chain.render_targets[bb],
                D3D12_RESOURCE_STATE_PRESENT,
                D3D12_RESOURCE_STATE_RENDER_TARGET,
            );
            self.command_list.ResourceBarrier(&[barrier]);
            self.command_list
                .OMSetRenderTargets(1, Some(&swap_chain.rtv_handles[bb]), false, None);
            if let Some(col) = &swap_chain.clear_colour {
                self.command_list.ClearRenderTargetView(
                    swap_chain.rtv_handles[bb],
                    &[col.r, col.g, col.b, col.a],
                    None,
                );
            }
        }
    }

    fn end_render(&mut self, swap_chain: &SwapChain) {
        let bb = swap_chain.backbuffer_index as usize;
        unsafe {
            let barrier = transition_barrier(
                &swap_chain.render_targets[bb],
                D3D12_RESOURCE_STATE_RENDER_TARGET,
                D3D12_RESOURCE_STATE_PRESENT,
            );
            self.command_list.ResourceBarrier(&[barrier]);
        }
    }

    fn set_viewport(&mut self, viewport: &Viewport) {
        let d3d12_vp = D3D12_VIEWPORT {
            TopLeftX: viewport.x,
            TopLeftY: viewport.y,
            Width: viewport.width,
            Height: viewport.height,
            MinDepth: viewport.min_depth,
            MaxDepth: viewport.max_depth,
        };
        unsafe {
            self.command_list.RSSetViewports(&[d3d12_vp]);
        }
    }

    fn set_scissor_rect(&mut self, scissor_rect: &ScissorRect) {
        let d3d12_sr = RECT {
            left: scissor_rect.left,
            top: scissor_rect.top,
            right: scissor_rect.right,
            bottom: scissor_rect.bottom,
        };
        unsafe {
            self.command_list.RSSetScissorRects(&[d3d12_sr]);
        }
    }

    fn set_topology(&mut self, topology: Topology) {
        unsafe {
            self.command_list
                .IASetPrimitiveTopology(to_d3d_topology(topology));
        }
    }

    fn set_vertex_buffer(&mut self, buffer: &Buffer, slot: u32) {
        if let Some(vbv) = &buffer.vbv {
            unsafe {
                self.command_list.IASetVertexBuffers(slot, Some(&[*vbv]));
            }
        }
    }

    fn set_index_buffer(&mut self, buffer: &Buffer) {
        if let Some(ibv) = &buffer.ibv {
            unsafe {
                self.command_list.IASetIndexBuffer(Some(ibv));
            }
        }
    }

    fn draw_instanced(
        &mut self,
        vertex_count: u32,
        instance_count: u32,
        start_vertex: u32,
        start_instance: u32,
    ) {
        unsafe {
            self.command_list
                .DrawInstanced(vertex_count, instance_count, start_vertex, start_instance);
        }
    }

    fn draw_indexed_instanced(
        &mut self,
        index_count: u32,
        instance_count: u32,
        start_index: u32,
        base_vertex: i32,
        start_instance: u32,
    ) {
        unsafe {
            self.command_list.DrawIndexedInstanced(
                index_count,
                instance_count,
                start_index,
                base_vertex,
                start_instance,
            );
        }
    }
}

impl SwapChain {
    fn create_backbuffer_views(&mut self, device: &Device) -> Result<(), Error> {
        unsafe {
            let rtv_descriptor_size = device
                .device
                .GetDescriptorHandleIncrementSize(D3D12_DESCRIPTOR_HEAP_TYPE_RTV)
                as usize;
            let rtv_start = self.rtv_heap.GetCPUDescriptorHandleForHeapStart();

            self.rtv_handles.clear();
            self.render_targets.clear();
            for i in 0..self.num_buffers {
                let render_target: ID3D12Resource = self.swap_chain.GetBuffer(i)?;
                let handle = D3D12_CPU_DESCRIPTOR_HANDLE {
                    ptr: rtv_start.ptr + i as usize * rtv_descriptor_size,
                };
                device
                    .device
                    .CreateRenderTargetView(&render_target, None, handle);
                self.rtv_handles.push(handle);
                self.render_targets.push(render_target);
            }
        }
        Ok(())
    }
}

impl super::SwapChain<Device> for SwapChain {
    fn new_frame(&mut self, queue: &CmdQueue) {
        let target = self.frame_fence_value[self.backbuffer_index as usize];
        queue.wait(target);
    }

    fn update<A: os::App>(&mut self, device: &mut Device, queue: &mut CmdQueue, window: &A::Window) {
        let (width, height) = window.get_size();
        if width != self.width || height != self.height {
            // drain the queue, the backbuffers must not be referenced by any
            // in-flight command list while they are released and resized
            queue.flush();
            self.width = std::cmp::max(width, 1);
            self.height = std::cmp::max(height, 1);

            self.render_targets.clear();
            self.rtv_handles.clear();
            unsafe {
                self.swap_chain
                    .ResizeBuffers(
                        self.num_buffers,
                        self.width as u32,
                        self.height as u32,
                        DXGI_FORMAT_UNKNOWN,
                        DXGI_SWAP_CHAIN_FLAG(0),
                    )
                    .expect("flightline::gfx::d3d12: failed to resize swap chain buffers");
            }
            self.create_backbuffer_views(device)
                .expect("flightline::gfx::d3d12: failed to recreate backbuffer views");
            self.backbuffer_index = unsafe { self.swap_chain.GetCurrentBackBufferIndex() };

            for value in &mut self.frame_fence_value {
                *value = queue.get_last_signalled();
            }

            log::info!(
                "flightline::gfx::d3d12: resized swap chain to {}x{}",
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
        unsafe {
            let interval = if self.vsync { 1 } else { 0 };
            self.swap_chain
                .Present(interval, DXGI_PRESENT::default())
                .ok()
                .expect("flightline::gfx::d3d12: failed to present swap chain");
        }
        let target = queue.signal();
        self.frame_fence_value[self.backbuffer_index as usize] = target;
        self.last_presented = target;
        // dxgi chooses the next backbuffer, it is not necessarily cyclic
        self.backbuffer_index = unsafe { self.swap_chain.GetCurrentBackBufferIndex() };
    }

    fn wait_for_last_frame(&self, queue: &CmdQueue) {
        let target = self.frame_fence_value.iter().copied().max().unwrap_or(0);
        queue.wait(target);
    }
}

impl super::Buffer<Device> for Buffer {}
