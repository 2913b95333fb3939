use stm32f4xx_hal::{
    gpio::{Alternate, Pin},
    pac::{USART1, USART2},
    serial::{Rx, Serial, Tx},
};

type LinkTx = Pin<'A', 2_u8, Alternate<7_u8>>;
type LinkRxPin = Pin<'A', 3_u8, Alternate<7_u8>>;

pub type DebugSerialPort = Tx<USART1>;
/// UART from the radio bridge carrying glove frames
pub type LinkSerialPort = Serial<USART2>;
pub type LinkRx = Rx<USART2>;
