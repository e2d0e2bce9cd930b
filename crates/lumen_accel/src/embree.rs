//! Intel Embree 4 backend.
//!
//! Manual FFI bindings covering only what the accelerator needs: one
//! geometry per primitive (triangle meshes and sphere points) attached to a
//! single scene, queried with `rtcIntersect1`.

use crate::{
    primitive::{Geometry, Primitive, T_EPSILON},
    AccelError, Result, SurfaceInteraction,
};
use lumen_math::{Bounds3, Ray, Vec2, Vec3};
use std::ffi::c_void;

// ============================================================================
// Embree FFI Bindings
// ============================================================================

#[allow(non_camel_case_types)]
type RTCDevice = *mut c_void;

#[allow(non_camel_case_types)]
type RTCScene = *mut c_void;

#[allow(non_camel_case_types)]
type RTCGeometry = *mut c_void;

// Geometry types (rtcore_geometry.h)
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[allow(dead_code)]
enum RTCGeometryType {
    Triangle = 0,
    SpherePoint = 50,
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[allow(dead_code)]
enum RTCBufferType {
    Index = 0,
    Vertex = 1,
}

// Buffer formats (rtcore_common.h)
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[allow(dead_code)]
enum RTCFormat {
    UInt3 = 0x5003,
    Float3 = 0x9003,
    Float4 = 0x9004,
}

#[repr(C, align(16))]
#[derive(Debug, Copy, Clone)]
struct RTCRay {
    org_x: f32,
    org_y: f32,
    org_z: f32,
    tnear: f32,

    dir_x: f32,
    dir_y: f32,
    dir_z: f32,
    time: f32,

    tfar: f32,
    mask: u32,
    id: u32,
    flags: u32,
}

#[repr(C, align(16))]
#[derive(Debug, Copy, Clone)]
struct RTCHit {
    ng_x: f32,
    ng_y: f32,
    ng_z: f32,

    u: f32,
    v: f32,

    prim_id: u32,
    geom_id: u32,
    inst_id: [u32; 1],
}

#[repr(C, align(16))]
#[derive(Debug, Copy, Clone)]
struct RTCRayHit {
    ray: RTCRay,
    hit: RTCHit,
}

const RTC_INVALID_GEOMETRY_ID: u32 = 0xFFFF_FFFF;

extern "C" {
    fn rtcNewDevice(config: *const std::ffi::c_char) -> RTCDevice;
    fn rtcReleaseDevice(device: RTCDevice);
    fn rtcGetDeviceError(device: RTCDevice) -> i32;

    fn rtcNewScene(device: RTCDevice) -> RTCScene;
    fn rtcReleaseScene(scene: RTCScene);
    fn rtcCommitScene(scene: RTCScene);

    fn rtcNewGeometry(device: RTCDevice, geom_type: RTCGeometryType) -> RTCGeometry;
    fn rtcReleaseGeometry(geom: RTCGeometry);
    fn rtcCommitGeometry(geom: RTCGeometry);
    fn rtcAttachGeometryByID(scene: RTCScene, geom: RTCGeometry, geom_id: u32);

    fn rtcSetNewGeometryBuffer(
        geom: RTCGeometry,
        buffer_type: u32,
        slot: u32,
        format: u32,
        byte_stride: usize,
        item_count: usize,
    ) -> *mut c_void;

    fn rtcIntersect1(scene: RTCScene, rayhit: *mut RTCRayHit, args: *const c_void);
}

// ============================================================================
// Owned handles
// ============================================================================

struct Device(RTCDevice);

impl Device {
    fn new() -> Result<Self> {
        // SAFETY: a null config selects Embree's defaults
        let raw = unsafe { rtcNewDevice(std::ptr::null()) };
        if raw.is_null() {
            // Device-less errors are reported through the null device
            let code = unsafe { rtcGetDeviceError(std::ptr::null_mut()) };
            return Err(AccelError::embree("rtcNewDevice", code));
        }
        let device = Device(raw);
        device.check("rtcNewDevice")?;
        Ok(device)
    }

    fn check(&self, stage: &'static str) -> Result<()> {
        let code = unsafe { rtcGetDeviceError(self.0) };
        if code != 0 {
            return Err(AccelError::embree(stage, code));
        }
        Ok(())
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        unsafe { rtcReleaseDevice(self.0) }
    }
}

struct Scene(RTCScene);

impl Scene {
    fn new(device: &Device) -> Result<Self> {
        let raw = unsafe { rtcNewScene(device.0) };
        if raw.is_null() {
            device.check("rtcNewScene")?;
            return Err(AccelError::embree("rtcNewScene", 1));
        }
        Ok(Scene(raw))
    }
}

impl Drop for Scene {
    fn drop(&mut self) {
        unsafe { rtcReleaseScene(self.0) }
    }
}

// Released once attached; the scene keeps its own reference
struct GeometryHandle(RTCGeometry);

impl Drop for GeometryHandle {
    fn drop(&mut self) {
        unsafe { rtcReleaseGeometry(self.0) }
    }
}

// ============================================================================
// EmbreeAccelerator
// ============================================================================

/// Accelerator backed by an Embree scene.
///
/// Each primitive with a [`Geometry`] becomes one Embree geometry whose id
/// maps back to the primitive's index in the build input.
pub struct EmbreeAccelerator {
    // Field order is drop order: scene before device
    scene: Scene,
    _device: Device,
    geometry_primitives: Vec<usize>,
    bounds: Bounds3,
    skipped: usize,
}

impl EmbreeAccelerator {
    pub fn new<P: Primitive>(primitives: &[P]) -> Result<Self> {
        let device = Device::new()?;
        let scene = Scene::new(&device)?;

        let mut geometry_primitives = Vec::with_capacity(primitives.len());
        let mut bounds = Bounds3::EMPTY;
        let mut skipped = 0;

        for (index, primitive) in primitives.iter().enumerate() {
            let Some(geometry) = primitive.geometry() else {
                log::warn!("Embree: primitive {} has no uploadable geometry, skipping", index);
                skipped += 1;
                continue;
            };

            let handle = upload(&device, &geometry)?;
            let geom_id = geometry_primitives.len() as u32;
            unsafe {
                rtcCommitGeometry(handle.0);
                rtcAttachGeometryByID(scene.0, handle.0, geom_id);
            }
            device.check("rtcAttachGeometry")?;

            geometry_primitives.push(index);
            bounds = Bounds3::union(&bounds, &primitive.world_bound());
        }

        unsafe { rtcCommitScene(scene.0) };
        device.check("rtcCommitScene")?;

        log::info!(
            "Embree scene committed: {} geometries, {} skipped",
            geometry_primitives.len(),
            skipped
        );

        Ok(Self {
            scene,
            _device: device,
            geometry_primitives,
            bounds,
            skipped,
        })
    }

    /// Number of primitives uploaded to the device.
    pub fn geometry_count(&self) -> usize {
        self.geometry_primitives.len()
    }

    /// Number of primitives skipped for lack of geometry.
    pub fn skipped_count(&self) -> usize {
        self.skipped
    }

    pub fn intersect(&self, ray: &Ray, t_hit: &mut f32, interaction: &mut SurfaceInteraction) -> bool {
        let mut rayhit = ray_hit(ray, *t_hit);
        unsafe { rtcIntersect1(self.scene.0, &mut rayhit, std::ptr::null()) };

        if rayhit.hit.geom_id == RTC_INVALID_GEOMETRY_ID || rayhit.ray.tfar >= *t_hit {
            return false;
        }
        let Some(&primitive) = self.geometry_primitives.get(rayhit.hit.geom_id as usize) else {
            return false;
        };

        let t = rayhit.ray.tfar;
        let normal = Vec3::new(rayhit.hit.ng_x, rayhit.hit.ng_y, rayhit.hit.ng_z).normalize_or_zero();
        interaction.set_hit(
            ray.direction(),
            ray.at(t),
            normal,
            Vec2::new(rayhit.hit.u, rayhit.hit.v),
        );
        interaction.primitive = Some(primitive);
        *t_hit = t;
        true
    }

    pub fn world_bound(&self) -> Bounds3 {
        self.bounds
    }

    pub fn object_bound(&self) -> Bounds3 {
        self.bounds
    }
}

// SAFETY: a committed Embree scene supports concurrent rtcIntersect1 calls,
// and nothing mutates the scene or device after construction.
unsafe impl Send for EmbreeAccelerator {}
unsafe impl Sync for EmbreeAccelerator {}

fn ray_hit(ray: &Ray, t_max: f32) -> RTCRayHit {
    RTCRayHit {
        ray: RTCRay {
            org_x: ray.origin().x,
            org_y: ray.origin().y,
            org_z: ray.origin().z,
            tnear: T_EPSILON,

            dir_x: ray.direction().x,
            dir_y: ray.direction().y,
            dir_z: ray.direction().z,
            time: ray.time(),

            tfar: t_max,
            mask: 0xFFFF_FFFF,
            id: 0,
            flags: 0,
        },
        hit: RTCHit {
            ng_x: 0.0,
            ng_y: 0.0,
            ng_z: 0.0,
            u: 0.0,
            v: 0.0,
            prim_id: RTC_INVALID_GEOMETRY_ID,
            geom_id: RTC_INVALID_GEOMETRY_ID,
            inst_id: [RTC_INVALID_GEOMETRY_ID],
        },
    }
}

/// Create a device geometry holding `geometry` in Embree-owned buffers.
fn upload(device: &Device, geometry: &Geometry) -> Result<GeometryHandle> {
    match geometry {
        Geometry::Triangles(triangles) => {
            let handle = new_geometry(device, RTCGeometryType::Triangle)?;
            let vertices = new_buffer::<[f32; 3]>(
                device,
                &handle,
                RTCBufferType::Vertex,
                RTCFormat::Float3,
                triangles.len() * 3,
            )?;
            let indices = new_buffer::<[u32; 3]>(
                device,
                &handle,
                RTCBufferType::Index,
                RTCFormat::UInt3,
                triangles.len(),
            )?;

            // Unshared vertices: triangle i uses vertices 3i..3i+3
            for (i, tri) in triangles.iter().enumerate() {
                for (k, v) in tri.iter().enumerate() {
                    vertices[i * 3 + k] = v.to_array();
                }
                let base = (i * 3) as u32;
                indices[i] = [base, base + 1, base + 2];
            }
            Ok(handle)
        }
        Geometry::Sphere { center, radius } => {
            let handle = new_geometry(device, RTCGeometryType::SpherePoint)?;
            let points = new_buffer::<[f32; 4]>(
                device,
                &handle,
                RTCBufferType::Vertex,
                RTCFormat::Float4,
                1,
            )?;
            points[0] = [center.x, center.y, center.z, *radius];
            Ok(handle)
        }
    }
}

fn new_geometry(device: &Device, geom_type: RTCGeometryType) -> Result<GeometryHandle> {
    let raw = unsafe { rtcNewGeometry(device.0, geom_type) };
    if raw.is_null() {
        device.check("rtcNewGeometry")?;
        return Err(AccelError::embree("rtcNewGeometry", 1));
    }
    Ok(GeometryHandle(raw))
}

/// Allocate an Embree-owned buffer of `count` items of `T` on `geometry`.
fn new_buffer<'a, T>(
    device: &Device,
    geometry: &'a GeometryHandle,
    buffer_type: RTCBufferType,
    format: RTCFormat,
    count: usize,
) -> Result<&'a mut [T]> {
    let ptr = unsafe {
        rtcSetNewGeometryBuffer(
            geometry.0,
            buffer_type as u32,
            0,
            format as u32,
            std::mem::size_of::<T>(),
            count,
        )
    };
    device.check("rtcSetNewGeometryBuffer")?;
    if ptr.is_null() {
        return Err(AccelError::embree("rtcSetNewGeometryBuffer", 4));
    }
    // SAFETY: Embree allocated `count` items of `size_of::<T>()` bytes, with
    // 16-byte alignment, owned by the geometry for at least as long as `geometry`
    Ok(unsafe { std::slice::from_raw_parts_mut(ptr as *mut T, count) })
}
