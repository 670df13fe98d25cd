use nix::{ioctl_readwrite, ioctl_write_ptr};

use super::bindings;

// FW_CDEV_IOC_* are built from _IOW/_IOWR, which bindgen cannot expand.
const FW_CDEV_IOC_MAGIC: u8 = b'#';

#[cfg(all(target_os = "linux", feature = "native_cdev"))]
ioctl_readwrite!(fw_cdev_get_info, FW_CDEV_IOC_MAGIC, 0x00, bindings::fw_cdev_get_info);

#[cfg(all(target_os = "linux", feature = "native_cdev"))]
ioctl_write_ptr!(fw_cdev_send_request, FW_CDEV_IOC_MAGIC, 0x01, bindings::fw_cdev_send_request);
