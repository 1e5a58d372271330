//! Klein-bottle Life as a wgpu compute kernel.
//!
//! The device keeps two storage buffers and two bind groups, one per
//! direction; the step parity picks which one is dispatched, mirroring the
//! CPU [`klein::GenerationBuffers`].

use std::sync::mpsc;

use anyhow::{bail, ensure, Context};
use bytemuck::{Pod, Zeroable};
use klein::{Automaton, Cell, Topology, ALIVE};
use wgpu::util::DeviceExt;

const WORKGROUP_SIZE: u32 = 8;

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct Params {
    width: u32,
    height: u32,
    _pad: [u32; 2],
}

fn workgroups(topology: &Topology) -> (u32, u32) {
    (
        topology.width().div_ceil(WORKGROUP_SIZE),
        topology.height().div_ceil(WORKGROUP_SIZE),
    )
}

/// Pick an adapter and open a device suitable for the compute kernel.
pub async fn request_device() -> anyhow::Result<(wgpu::Device, wgpu::Queue)> {
    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        flags: wgpu::InstanceFlags::from_env_or_default(),
        ..Default::default()
    });

    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        })
        .await
        .context("request adapter")?;
    log::info!("using adapter {:?}", adapter.get_info().name);

    let (device, queue) = adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: Some("klein_device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::downlevel_defaults(),
            memory_hints: wgpu::MemoryHints::Performance,
            trace: wgpu::Trace::default(),
        })
        .await
        .context("request device")?;

    Ok((device, queue))
}

pub struct GpuAutomaton {
    device: wgpu::Device,
    queue: wgpu::Queue,
    pipeline: wgpu::ComputePipeline,
    cells: [wgpu::Buffer; 2],
    // bind_groups[p] reads cells[p] and writes cells[1 - p]
    bind_groups: [wgpu::BindGroup; 2],
    staging: wgpu::Buffer,
    topology: Topology,
    step: u64,
}

impl GpuAutomaton {
    pub async fn new(topology: Topology, initial: &[Cell]) -> anyhow::Result<Self> {
        let (device, queue) = request_device().await?;
        Self::with_device(device, queue, topology, initial)
    }

    /// Blocking constructor that copies the automaton's current generation.
    pub fn from_automaton(automaton: &Automaton) -> anyhow::Result<Self> {
        pollster::block_on(Self::new(*automaton.topology(), automaton.current()))
    }

    pub fn with_device(
        device: wgpu::Device,
        queue: wgpu::Queue,
        topology: Topology,
        initial: &[Cell],
    ) -> anyhow::Result<Self> {
        let limits = device.limits();
        let buffer_size = (topology.cell_count() * std::mem::size_of::<u32>()) as u64;
        let max_binding = u64::from(limits.max_storage_buffer_binding_size);
        if buffer_size > max_binding {
            bail!(
                "{}x{} grid needs {buffer_size} bytes per buffer, device allows {max_binding}",
                topology.width(),
                topology.height()
            );
        }
        let (groups_x, groups_y) = workgroups(&topology);
        let max_groups = limits.max_compute_workgroups_per_dimension;
        if groups_x > max_groups || groups_y > max_groups {
            bail!(
                "{}x{} grid needs {groups_x}x{groups_y} workgroups, device allows {max_groups} per dimension",
                topology.width(),
                topology.height()
            );
        }

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("life_shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("life.wgsl").into()),
        });

        let params = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("params_buffer"),
            contents: bytemuck::bytes_of(&Params {
                width: topology.width(),
                height: topology.height(),
                _pad: [0; 2],
            }),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        let cells = ["cells_a", "cells_b"].map(|label| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size: buffer_size,
                usage: wgpu::BufferUsages::STORAGE
                    | wgpu::BufferUsages::COPY_SRC
                    | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        });

        let staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("staging_buffer"),
            size: buffer_size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let storage_entry = |binding, read_only| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("life_bind_group_layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                storage_entry(1, true),
                storage_entry(2, false),
            ],
        });

        let bind_group = |label, read: &wgpu::Buffer, write: &wgpu::Buffer| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout: &bind_group_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: params.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: read.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: write.as_entire_binding(),
                    },
                ],
            })
        };
        let bind_groups = [
            bind_group("a_to_b", &cells[0], &cells[1]),
            bind_group("b_to_a", &cells[1], &cells[0]),
        ];

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("life_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("life_pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: Some("life_step"),
            compilation_options: wgpu::PipelineCompilationOptions::default(),
            cache: None,
        });

        let mut automaton = Self {
            device,
            queue,
            pipeline,
            cells,
            bind_groups,
            staging,
            topology,
            step: 0,
        };
        automaton.upload(initial)?;
        log::debug!(
            "gpu automaton ready: {}x{}",
            topology.width(),
            topology.height()
        );
        Ok(automaton)
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn step_count(&self) -> u64 {
        self.step
    }

    fn current_slot(&self) -> usize {
        (self.step % 2) as usize
    }

    /// Overwrite the current generation. The step counter is unchanged.
    pub fn upload(&mut self, cells: &[Cell]) -> anyhow::Result<()> {
        ensure!(
            cells.len() == self.topology.cell_count(),
            "expected {} cells, got {}",
            self.topology.cell_count(),
            cells.len()
        );
        ensure!(cells.iter().all(|&cell| cell <= ALIVE), "cells must be 0 or 1");

        let words: Vec<u32> = cells.iter().map(|&cell| u32::from(cell)).collect();
        self.queue
            .write_buffer(&self.cells[self.current_slot()], 0, bytemuck::cast_slice(&words));
        Ok(())
    }

    pub fn step(&mut self) {
        self.step_n(1);
    }

    /// Encode `generations` dispatches into one submission.
    pub fn step_n(&mut self, generations: u64) {
        if generations == 0 {
            return;
        }
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("step_encoder") });
        let (groups_x, groups_y) = workgroups(&self.topology);

        for _ in 0..generations {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("life_pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &self.bind_groups[self.current_slot()], &[]);
            pass.dispatch_workgroups(groups_x, groups_y, 1);
            drop(pass);
            self.step += 1;
        }

        self.queue.submit(Some(encoder.finish()));
        log::trace!("gpu generation {}", self.step);
    }

    /// Copy the current generation back to the host.
    pub fn read_current(&self) -> anyhow::Result<Vec<Cell>> {
        let size = self.staging.size();
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("readback_encoder") });
        encoder.copy_buffer_to_buffer(&self.cells[self.current_slot()], 0, &self.staging, 0, size);
        self.queue.submit(Some(encoder.finish()));

        let slice = self.staging.slice(..);
        let (sender, receiver) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        self.device.poll(wgpu::PollType::Wait).context("wait for readback")?;
        receiver
            .recv()
            .context("readback callback dropped")?
            .context("map staging buffer")?;

        let cells: Vec<Cell> = {
            let data = slice.get_mapped_range();
            let words: &[u32] = bytemuck::cast_slice(&data);
            words.iter().map(|&word| word as Cell).collect()
        };
        self.staging.unmap();
        Ok(cells)
    }
}
